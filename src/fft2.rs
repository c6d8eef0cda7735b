use std::sync::Arc;

use ndarray::parallel::prelude::{IntoParallelIterator, ParallelIterator};
use ndarray::{aview_mut1, ArrayViewMut1, ArrayViewMut2, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{Fft, FftDirection, FftPlanner};

/// Pair of 1D plans covering both axes of a 2D array.
#[derive(Clone)]
pub(crate) struct Plan2 {
    fft0: Arc<dyn Fft<f64>>,
    fft1: Arc<dyn Fft<f64>>,
}

impl Plan2 {
    pub fn new(planner: &mut FftPlanner<f64>, shape: [usize; 2], direction: FftDirection) -> Self {
        Plan2 {
            fft0: planner.plan_fft(shape[0], direction),
            fft1: planner.plan_fft(shape[1], direction),
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.fft0.len(), self.fft1.len()]
    }
}

/// performs a 2D (i)fft where the 0th component is at the center rather than the normal left,
/// with unitary normalisation.
/// removes the need for ifft_shift before and fft_shift after.
pub(crate) fn fft2c_planned(mut input: ArrayViewMut2<Complex<f64>>, plan: &Plan2) {
    debug_assert_eq!(input.shape(), &plan.shape()[..]);
    let fft0 = plan.fft0.as_ref();
    let fft1 = plan.fft1.as_ref();
    let normalisation = 1.0 / ((input.shape()[0] * input.shape()[1]) as f64).sqrt();

    // fft along axis1, iteration over axis0
    Zip::from(input.axis_iter_mut(Axis(0)))
        .into_par_iter()
        .for_each_init(
            || {
                (
                    vec![Zero::zero(); fft1.len()],
                    vec![Zero::zero(); fft1.get_inplace_scratch_len()],
                )
            },
            |(fft_buffer, scratch), input_row| {
                transform_lane(input_row.0, fft1, fft_buffer, scratch, 1.0);
            },
        );

    // fft along axis0, iteration over axis1
    Zip::from(input.axis_iter_mut(Axis(1)))
        .into_par_iter()
        .for_each_init(
            || {
                (
                    vec![Zero::zero(); fft0.len()],
                    vec![Zero::zero(); fft0.get_inplace_scratch_len()],
                )
            },
            |(fft_buffer, scratch), input_col| {
                transform_lane(input_col.0, fft0, fft_buffer, scratch, normalisation);
            },
        );
}

// lanes may be strided (columns), so work in a contiguous buffer
fn transform_lane(
    mut lane: ArrayViewMut1<Complex<f64>>,
    fft: &dyn Fft<f64>,
    fft_buffer: &mut [Complex<f64>],
    scratch: &mut [Complex<f64>],
    normalisation: f64,
) {
    debug_assert_eq!(lane.len(), fft_buffer.len());
    for (b, &e) in fft_buffer.iter_mut().zip(lane.iter()) {
        *b = e;
    }
    ifft_shift_inplace(aview_mut1(fft_buffer));
    fft.process_with_scratch(fft_buffer, scratch);
    fft_shift_inplace(aview_mut1(fft_buffer));
    for (e, &b) in lane.iter_mut().zip(fft_buffer.iter()) {
        *e = b * normalisation;
    }
}

/// Moves the origin (0) to the "center" of the array (N/2)
///
/// For even array lengths, which have no center value, this moves the value to the next value after the center
pub fn fft_shift_inplace(mut input: ArrayViewMut1<Complex<f64>>) {
    if input.len() % 2 == 0 {
        return fft_shift_even(input);
    }

    let len = input.len();
    let half = len / 2;

    let mut i = input.len();
    let mut j = half;
    let mut temp1 = input[half];
    for _ in 0..half {
        i -= 1;
        j -= 1;
        std::mem::swap(&mut temp1, &mut input[i]);

        std::mem::swap(&mut temp1, &mut input[j]);
    }
    input[half] = temp1;
}

/// Moves the "center" of the array (N/2) to the origin (0)
///
/// Inverts fft_shift exactly, accounting for the asymmetry of even arrays
pub fn ifft_shift_inplace(mut input: ArrayViewMut1<Complex<f64>>) {
    if input.len() % 2 == 0 {
        return fft_shift_even(input);
    }

    let len = input.len();
    let half = len / 2;

    let mut j = half + 1;
    let mut temp1 = input[half];
    for i in 0..half {
        std::mem::swap(&mut temp1, &mut input[i]);

        std::mem::swap(&mut temp1, &mut input[j]);

        j += 1;
    }
    input[half] = temp1;
}

fn fft_shift_even(mut input: ArrayViewMut1<Complex<f64>>) {
    let half = input.len() / 2;
    for i in 0..half {
        input.swap(i, i + half);
    }
}
