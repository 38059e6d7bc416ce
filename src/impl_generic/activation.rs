//! Activation-policy predicates.

use crate::traits::ActivationPolicy;

/// Whether the iteration-based entry point fires for this policy.
pub(crate) fn activates_by_iteration(policy: &ActivationPolicy, iter: usize) -> bool {
    match *policy {
        ActivationPolicy::Immediate => iter >= 2,
        ActivationPolicy::ByIteration { start_iter }
        | ActivationPolicy::ByIterationOrAccuracy { start_iter, .. } => iter >= start_iter,
        ActivationPolicy::ByAccuracy { .. } => false,
    }
}

/// Whether the residual-based entry point fires for this policy.
///
/// Each residual passes when `r < tol + tol · max_norm`; both must pass.
pub(crate) fn activates_by_residuals(
    policy: &ActivationPolicy,
    r_prim: f64,
    r_dual: f64,
    max_norm_prim: f64,
    max_norm_dual: f64,
) -> bool {
    match *policy {
        ActivationPolicy::ByAccuracy { tol }
        | ActivationPolicy::ByIterationOrAccuracy { tol, .. } => {
            r_prim < tol + tol * max_norm_prim && r_dual < tol + tol * max_norm_dual
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_needs_two_iterates() {
        let policy = ActivationPolicy::Immediate;
        assert!(!activates_by_iteration(&policy, 0));
        assert!(!activates_by_iteration(&policy, 1));
        assert!(activates_by_iteration(&policy, 2));
        assert!(!activates_by_residuals(&policy, 0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_by_iteration_threshold() {
        let policy = ActivationPolicy::ByIteration { start_iter: 5 };
        assert!(!activates_by_iteration(&policy, 4));
        assert!(activates_by_iteration(&policy, 5));
        assert!(!activates_by_residuals(&policy, 0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_by_accuracy_needs_both_residuals() {
        let policy = ActivationPolicy::ByAccuracy { tol: 1e-3 };
        // tol + tol * max_norm = 1e-3 + 1e-3 * 10 = 1.1e-2
        assert!(activates_by_residuals(&policy, 1e-2, 1e-2, 10.0, 10.0));
        assert!(!activates_by_residuals(&policy, 2e-2, 1e-2, 10.0, 10.0));
        assert!(!activates_by_residuals(&policy, 1e-2, 2e-2, 10.0, 10.0));
        assert!(!activates_by_iteration(&policy, 100));
    }

    #[test]
    fn test_union_policy_fires_either_way() {
        let policy = ActivationPolicy::ByIterationOrAccuracy {
            tol: 1e-3,
            start_iter: 8,
        };
        assert!(activates_by_iteration(&policy, 8));
        assert!(!activates_by_iteration(&policy, 7));
        assert!(activates_by_residuals(&policy, 1e-4, 1e-4, 0.0, 0.0));
    }
}
