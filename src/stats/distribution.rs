//! Student's t tail probabilities for correlation significance.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    if !t.is_finite() {
        return 1.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn t_test_reference_values() {
        // t = 2.228 at df = 10 is the 97.5th percentile.
        assert!(close(student_t_two_sided(2.228_138_85, 10.0), 0.05, 1e-6));
        assert!(close(student_t_two_sided(0.0, 5.0), 1.0, 1e-12));
        assert_eq!(student_t_two_sided(f64::INFINITY, 3.0), 0.0);
    }

    #[test]
    fn sign_of_statistic_does_not_matter() {
        let positive = student_t_two_sided(1.5, 4.0);
        let negative = student_t_two_sided(-1.5, 4.0);
        assert!(close(positive, negative, 1e-12));
    }

    #[test]
    fn non_positive_degrees_of_freedom_are_uninformative() {
        assert_eq!(student_t_two_sided(2.0, 0.0), 1.0);
        assert_eq!(student_t_two_sided(f64::NAN, 3.0), 1.0);
    }
}
