use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SwipeAction;

/// What a swipe led to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeOutcome {
    /// Both sides liked each other
    Matched,
    /// Liked, waiting on the other side
    Pending,
    Rejected,
}

/// Mutual-swipe detection.
///
/// `reverse` is the target's latest swipe on the swiper, if any.
pub fn resolve_swipe(action: SwipeAction, reverse: Option<SwipeAction>) -> SwipeOutcome {
    if !action.is_positive() {
        return SwipeOutcome::Rejected;
    }
    match reverse {
        Some(r) if r.is_positive() => SwipeOutcome::Matched,
        _ => SwipeOutcome::Pending,
    }
}

/// Order-independent pair of user ids identifying one match row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchPair {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

impl MatchPair {
    /// Returns `None` for a self-pair
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { user1_id: a, user2_id: b }),
            std::cmp::Ordering::Greater => Some(Self { user1_id: b, user2_id: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutual_like_matches() {
        assert_eq!(resolve_swipe(SwipeAction::Like, Some(SwipeAction::Like)), SwipeOutcome::Matched);
        assert_eq!(
            resolve_swipe(SwipeAction::Superlike, Some(SwipeAction::Like)),
            SwipeOutcome::Matched
        );
        assert_eq!(
            resolve_swipe(SwipeAction::Like, Some(SwipeAction::Superlike)),
            SwipeOutcome::Matched
        );
    }

    #[test]
    fn test_one_sided_like_is_pending() {
        assert_eq!(resolve_swipe(SwipeAction::Like, None), SwipeOutcome::Pending);
        assert_eq!(
            resolve_swipe(SwipeAction::Like, Some(SwipeAction::Reject)),
            SwipeOutcome::Pending
        );
    }

    #[test]
    fn test_reject_never_matches() {
        assert_eq!(
            resolve_swipe(SwipeAction::Reject, Some(SwipeAction::Superlike)),
            SwipeOutcome::Rejected
        );
    }

    #[test]
    fn test_match_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(MatchPair::new(a, b), MatchPair::new(b, a));
        let pair = MatchPair::new(a, b).unwrap();
        assert!(pair.user1_id < pair.user2_id);
        assert!(MatchPair::new(a, a).is_none());
    }
}
