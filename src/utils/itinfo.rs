//! Iteration information printing, gated by [`PrintLevel`].

use num_traits::{Float, ToPrimitive};

use crate::config::options::{PrintLevel, StopType};

fn f<T: ToPrimitive>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Column header followed by one line per iteration; printed when the level
/// is `Some` or higher. The convergence factor column appears at `More`.
pub fn print_itinfo<T: Float>(
    level: PrintLevel,
    stop_type: StopType,
    iteration: usize,
    relres: T,
    absres: T,
    factor: T,
) {
    if level < PrintLevel::Some {
        return;
    }
    if iteration == 0 {
        let label = match stop_type {
            StopType::RelRes => "||r||/||b||",
            StopType::RelPrecRes => "||r||_B/||b||_B",
            StopType::RelModRes => "||r||/||x||",
        };
        println!("It Num | {:>15} |    ||r||    | Conv. Factor", label);
    }
    if level >= PrintLevel::More && iteration > 0 {
        println!(
            "{:6} | {:15.7e} | {:11.5e} | {:10.4}",
            iteration,
            f(relres),
            f(absres),
            f(factor)
        );
    } else {
        println!("{:6} | {:15.7e} | {:11.5e} |", iteration, f(relres), f(absres));
    }
}

/// Final one-line outcome, printed when the level is above `None`.
pub fn print_final<T: Float>(level: PrintLevel, method: &str, iterations: usize, relres: T) {
    if level > PrintLevel::None {
        println!(
            "{}: number of iterations = {} with relative residual {:.6e}",
            method,
            iterations,
            f(relres)
        );
    }
}

/// Notice emitted when the implicit residual claimed convergence but the
/// recomputed residual disagrees.
pub fn print_false_convergence(level: PrintLevel) {
    if level >= PrintLevel::Some {
        println!("### WARNING: False convergence, continue iterating from true residual");
    }
}

/// Wall-clock summary, printed when the level is `Min` or higher.
pub fn print_cputime(level: PrintLevel, label: &str, seconds: f64) {
    if level >= PrintLevel::Min {
        println!("{} costs {:.4} seconds", label, seconds);
    }
}
