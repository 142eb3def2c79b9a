use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the integrators.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Represents a first-order system of ODEs, y' = f(r, y).
///
/// Evaluation is fallible: a right-hand side backed by tabulated data can be
/// asked for a point outside its table.
pub trait DynamicalSystem<T: Scalar> {
    type Error;

    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// r: independent variable
    /// x: current state
    /// out: buffer to write dx/dr
    fn apply(&self, r: T, x: &[T], out: &mut [T]) -> Result<(), Self::Error>;
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dr.
    /// r: current position (updated after step)
    /// state: current state (updated after step)
    /// dr: step size
    ///
    /// On error `r` and `state` are left untouched.
    fn step<S: DynamicalSystem<T>>(
        &mut self,
        system: &S,
        r: &mut T,
        state: &mut [T],
        dr: T,
    ) -> Result<(), S::Error>;
}

/// Chooses the size of the next step from the current state and its derivative.
pub trait StepControl<T: Scalar> {
    fn next_step(&self, state: &[T], derivative: &[T]) -> T;
}
