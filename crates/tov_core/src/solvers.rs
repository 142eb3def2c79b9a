use crate::traits::{DynamicalSystem, Scalar, StepControl, Steppable};

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step<S: DynamicalSystem<T>>(
        &mut self,
        system: &S,
        r: &mut T,
        state: &mut [T],
        dr: T,
    ) -> Result<(), S::Error> {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        let r0 = *r;
        let n = state.len();

        system.apply(r0, state, &mut self.k1)?;

        for i in 0..n {
            self.tmp[i] = state[i] + dr * self.k1[i] * half;
        }
        system.apply(r0 + dr * half, &self.tmp, &mut self.k2)?;

        for i in 0..n {
            self.tmp[i] = state[i] + dr * self.k2[i] * half;
        }
        system.apply(r0 + dr * half, &self.tmp, &mut self.k3)?;

        for i in 0..n {
            self.tmp[i] = state[i] + dr * self.k3[i];
        }
        system.apply(r0 + dr, &self.tmp, &mut self.k4)?;

        // y_next = y + dr/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..n {
            state[i] = state[i]
                + dr * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *r = r0 + dr;
        Ok(())
    }
}

/// Step control bounding the relative change of a growing component
/// (index 0) and a decaying component (index 1) per step:
///
/// dr = delta / (y0'/y0 - y1'/y1)
///
/// Undefined where both relative rates vanish, e.g. at the very center of a
/// star, so the first step must be supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct RelativeRateControl<T: Scalar> {
    pub delta: T,
}

impl<T: Scalar> RelativeRateControl<T> {
    pub fn new(delta: T) -> Self {
        Self { delta }
    }
}

impl<T: Scalar> StepControl<T> for RelativeRateControl<T> {
    fn next_step(&self, state: &[T], derivative: &[T]) -> T {
        let rate = derivative[0] / state[0] - derivative[1] / state[1];
        self.delta / rate
    }
}
