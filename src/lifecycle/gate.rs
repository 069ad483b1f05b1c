//! The update decision.
//!
//! [`UpdateGate::decide`] is a pure function of its inputs, evaluated in
//! priority order:
//!
//! | local outdated | remote check            | mode      | decision                          |
//! |----------------|-------------------------|-----------|-----------------------------------|
//! | yes            | (ignored)               | (ignored) | `ForcedRedirect`                  |
//! | no             | absent / not available  | (ignored) | `NoUpdateNeeded`                  |
//! | no             | available               | Automatic | `UpdateAvailable { auto: true }`  |
//! | no             | available               | Manual    | `UpdateAvailable { auto: false }` |

use tracing::debug;

use crate::config::UpdateMode;
use crate::update::UpdateCheck;

/// What the silent path should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Nothing to install.
    NoUpdateNeeded,
    /// A newer release exists.
    UpdateAvailable {
        /// Version label of the release.
        version: String,
        /// Install without asking.
        auto_install: bool,
    },
    /// The updater itself is too old; hand over to the interactive path.
    ForcedRedirect,
}

/// Inputs to [`UpdateGate::decide`].
#[derive(Debug, Clone, Default)]
pub struct GateInputs {
    /// Whether the manifest cache was refreshed for this launch.
    pub cache_refreshed: bool,
    /// Whether the running updater is older than the published one.
    pub local_outdated: bool,
    /// Result of the release check; `None` when it was skipped.
    pub remote: Option<UpdateCheck>,
    /// User preference for applying updates.
    pub preferred_mode: UpdateMode,
}

/// Stateless decision function for the silent path.
pub struct UpdateGate;

impl UpdateGate {
    /// Decide what to do with the given inputs.
    pub fn decide(inputs: &GateInputs) -> UpdateDecision {
        if !inputs.cache_refreshed {
            debug!("Deciding on a manifest that was not refreshed this launch");
        }

        if inputs.local_outdated {
            return UpdateDecision::ForcedRedirect;
        }

        match &inputs.remote {
            Some(check) if check.update_available => UpdateDecision::UpdateAvailable {
                version: check.version.clone(),
                auto_install: inputs.preferred_mode == UpdateMode::Automatic,
            },
            _ => UpdateDecision::NoUpdateNeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(local_outdated: bool, remote: Option<UpdateCheck>, mode: UpdateMode) -> GateInputs {
        GateInputs {
            cache_refreshed: true,
            local_outdated,
            remote,
            preferred_mode: mode,
        }
    }

    #[test]
    fn test_outdated_updater_wins_over_everything() {
        for remote in [None, Some(UpdateCheck::none()), Some(UpdateCheck::available("3.2.1"))] {
            for mode in [UpdateMode::Automatic, UpdateMode::Manual] {
                assert_eq!(
                    UpdateGate::decide(&inputs(true, remote.clone(), mode)),
                    UpdateDecision::ForcedRedirect
                );
            }
        }
    }

    #[test]
    fn test_no_release_information() {
        assert_eq!(
            UpdateGate::decide(&inputs(false, None, UpdateMode::Automatic)),
            UpdateDecision::NoUpdateNeeded
        );
    }

    #[test]
    fn test_release_not_newer() {
        let remote = UpdateCheck {
            version: "3.2.1".to_string(),
            update_available: false,
        };
        assert_eq!(
            UpdateGate::decide(&inputs(false, Some(remote), UpdateMode::Automatic)),
            UpdateDecision::NoUpdateNeeded
        );
    }

    #[test]
    fn test_available_release_follows_mode() {
        assert_eq!(
            UpdateGate::decide(&inputs(
                false,
                Some(UpdateCheck::available("3.2.1")),
                UpdateMode::Automatic
            )),
            UpdateDecision::UpdateAvailable {
                version: "3.2.1".to_string(),
                auto_install: true,
            }
        );
        assert_eq!(
            UpdateGate::decide(&inputs(
                false,
                Some(UpdateCheck::available("3.2.1")),
                UpdateMode::Manual
            )),
            UpdateDecision::UpdateAvailable {
                version: "3.2.1".to_string(),
                auto_install: false,
            }
        );
    }

    #[test]
    fn test_stale_cache_does_not_change_outcome() {
        let mut stale = inputs(false, Some(UpdateCheck::available("3.2.1")), UpdateMode::Manual);
        let fresh = UpdateGate::decide(&stale);
        stale.cache_refreshed = false;
        assert_eq!(UpdateGate::decide(&stale), fresh);
    }

    #[test]
    fn test_decide_is_deterministic() {
        let input = inputs(false, Some(UpdateCheck::available("3.2.1")), UpdateMode::Automatic);
        assert_eq!(UpdateGate::decide(&input), UpdateGate::decide(&input));
    }
}
