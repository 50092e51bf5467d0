//! Group-based access resolution.
//!
//! [`AccessResolver::has_access`] decides whether a principal holds any of a
//! set of permission names by walking its group memberships. Groups are
//! checked concurrently and the first group granting access wins.
//!
//! Group checks run in a [`JoinSet`] owned by the call. Returning early, or
//! dropping the call's future, drops the set and aborts every check still in
//! flight, so no task outlives the decision.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::constants::{GUEST_FULL_ACCESS, SYSTEM_PRINCIPAL};
use crate::storage::UserGroup;
use crate::{AuthError, AuthResult};

/// Membership and grant lookups needed to resolve access.
#[async_trait]
pub trait MembershipSource: Send + Sync + 'static {
    /// Every group the user belongs to.
    async fn groups_of(&self, user_id: &str) -> AuthResult<Vec<UserGroup>>;

    /// Whether the group is granted the named permission.
    async fn group_has_permission(&self, group_id: &str, permission: &str) -> AuthResult<bool>;
}

/// Resolves allow/deny decisions for principals.
#[derive(Clone)]
pub struct AccessResolver {
    memberships: Arc<dyn MembershipSource>,
    max_concurrency: usize,
}

impl AccessResolver {
    #[must_use]
    pub fn new(memberships: Arc<dyn MembershipSource>, max_concurrency: usize) -> Self {
        Self {
            memberships,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Succeeds if the principal holds at least one of `permissions`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` on deny, or the underlying error if the
    /// principal's memberships cannot be loaded.
    pub async fn has_access(&self, principal_id: &str, permissions: &[&str]) -> AuthResult<()> {
        if self.check(principal_id, permissions).await? {
            Ok(())
        } else {
            Err(AuthError::unauthorized(format!(
                "principal {principal_id} holds none of the required permissions"
            )))
        }
    }

    /// Returns the decision as a boolean.
    ///
    /// A failed per-group check counts as "this group does not grant access".
    /// Only a failure to load the memberships themselves is an error.
    #[instrument(skip(self), fields(groups = tracing::field::Empty))]
    pub async fn check(&self, principal_id: &str, permissions: &[&str]) -> AuthResult<bool> {
        if principal_id == SYSTEM_PRINCIPAL {
            return Ok(true);
        }

        let groups = self.memberships.groups_of(principal_id).await?;
        tracing::Span::current().record("groups", groups.len());
        if groups.is_empty() {
            debug!("principal has no groups");
            return Ok(false);
        }

        if permissions.contains(&GUEST_FULL_ACCESS) {
            return Ok(true);
        }

        let requested: Arc<[String]> = permissions.iter().map(|p| (*p).to_string()).collect();
        let limiter = Arc::new(Semaphore::new(self.max_concurrency));
        let mut checks = JoinSet::new();

        for membership in groups {
            let source = Arc::clone(&self.memberships);
            let requested = Arc::clone(&requested);
            let limiter = Arc::clone(&limiter);
            checks.spawn(async move {
                // The semaphore is never closed.
                let _permit = limiter.acquire_owned().await.ok()?;
                Some(grants_any(source.as_ref(), &membership.group_id, &requested).await)
            });
        }

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(Some(true)) => {
                    debug!("access granted");
                    return Ok(true);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "group check task failed"),
            }
        }

        debug!("access denied");
        Ok(false)
    }
}

/// Whether one group holds any requested permission.
///
/// A failed lookup counts as "not granted" for that name only; the remaining
/// names are still tried.
async fn grants_any(source: &dyn MembershipSource, group_id: &str, requested: &[String]) -> bool {
    for permission in requested {
        match source.group_has_permission(group_id, permission).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => {
                warn!(group_id = %group_id, permission = %permission, error = %e, "permission lookup failed, treating as not granted");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Per-group behaviour of the mock source.
    #[derive(Clone)]
    enum GroupBehaviour {
        Grants(HashSet<String>),
        Fails,
        /// Lookups of `failing` error, the others answer from `grants`.
        PartlyFails {
            failing: String,
            grants: HashSet<String>,
        },
        Hangs,
        /// Grants once `n` hanging lookups are in flight.
        GrantsAfterHangs(HashSet<String>, usize),
    }

    /// Counts hanging lookups that started and those not yet dropped.
    #[derive(Default)]
    struct HangTracker {
        started: AtomicUsize,
        live: AtomicUsize,
    }

    struct LiveGuard(Arc<HangTracker>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockMemberships {
        groups: HashMap<String, Vec<(String, GroupBehaviour)>>,
        fail_membership_lookup: bool,
        calls: AtomicUsize,
        delay: Duration,
        hangs: Arc<HangTracker>,
    }

    impl MockMemberships {
        fn with_user(mut self, user: &str, groups: Vec<(&str, GroupBehaviour)>) -> Self {
            self.groups.insert(
                user.to_string(),
                groups
                    .into_iter()
                    .map(|(g, b)| (g.to_string(), b))
                    .collect(),
            );
            self
        }

        fn behaviour(&self, group_id: &str) -> Option<GroupBehaviour> {
            self.groups
                .values()
                .flatten()
                .find(|(g, _)| g == group_id)
                .map(|(_, b)| b.clone())
        }
    }

    fn grants(names: &[&str]) -> GroupBehaviour {
        GroupBehaviour::Grants(names.iter().map(|n| (*n).to_string()).collect())
    }

    #[async_trait]
    impl MembershipSource for MockMemberships {
        async fn groups_of(&self, user_id: &str) -> AuthResult<Vec<UserGroup>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_membership_lookup {
                return Err(AuthError::storage("db down"));
            }
            Ok(self
                .groups
                .get(user_id)
                .map(|gs| gs.iter().map(|(g, _)| UserGroup::new(user_id, g)).collect())
                .unwrap_or_default())
        }

        async fn group_has_permission(&self, group_id: &str, permission: &str) -> AuthResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.behaviour(group_id) {
                Some(GroupBehaviour::Grants(names)) => Ok(names.contains(permission)),
                Some(GroupBehaviour::Fails) => Err(AuthError::storage("lookup failed")),
                Some(GroupBehaviour::PartlyFails { failing, grants }) => {
                    if failing == permission {
                        Err(AuthError::storage("lookup failed"))
                    } else {
                        Ok(grants.contains(permission))
                    }
                }
                Some(GroupBehaviour::Hangs) => {
                    self.hangs.live.fetch_add(1, Ordering::SeqCst);
                    let _guard = LiveGuard(Arc::clone(&self.hangs));
                    self.hangs.started.fetch_add(1, Ordering::SeqCst);
                    std::future::pending::<()>().await;
                    Ok(false)
                }
                Some(GroupBehaviour::GrantsAfterHangs(names, n)) => {
                    while self.hangs.started.load(Ordering::SeqCst) < n {
                        tokio::task::yield_now().await;
                    }
                    Ok(names.contains(permission))
                }
                None => Ok(false),
            }
        }
    }

    fn build(mock: MockMemberships) -> (AccessResolver, Arc<MockMemberships>) {
        let mock = Arc::new(mock);
        (AccessResolver::new(mock.clone(), 8), mock)
    }

    #[tokio::test]
    async fn test_system_principal_bypasses_lookups() {
        let (resolver, mock) = build(MockMemberships::default());

        for perms in [vec!["ANYTHING"], vec!["A", "B", "C"], vec![""]] {
            assert!(resolver.check(SYSTEM_PRINCIPAL, &perms).await.unwrap());
        }
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_groups_denies() {
        let (resolver, _) = build(MockMemberships::default());

        assert!(!resolver.check("nobody", &["GROUP_READ"]).await.unwrap());
        let err = resolver
            .has_access("nobody", &["GROUP_READ"])
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_no_groups_denies_guest_too() {
        let (resolver, _) = build(MockMemberships::default());
        assert!(!resolver.check("nobody", &[GUEST_FULL_ACCESS]).await.unwrap());
    }

    #[tokio::test]
    async fn test_guest_sentinel_allows_any_member() {
        let (resolver, mock) = build(
            MockMemberships::default().with_user("u1", vec![("g1", grants(&[]))]),
        );

        assert!(
            resolver
                .check("u1", &["REPORT_READ", GUEST_FULL_ACCESS])
                .await
                .unwrap()
        );
        // Only the membership lookup ran.
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_allows_iff_some_group_grants() {
        let (resolver, _) = build(MockMemberships::default().with_user(
            "u1",
            vec![
                ("g1", grants(&[])),
                ("g2", grants(&["OTHER"])),
                ("g3", grants(&["REPORT_READ"])),
                ("g4", grants(&[])),
            ],
        ));

        assert!(resolver.check("u1", &["REPORT_READ"]).await.unwrap());
        assert!(resolver.check("u1", &["NOPE", "OTHER"]).await.unwrap());
        assert!(!resolver.check("u1", &["NOPE"]).await.unwrap());
        assert!(!resolver.check("u1", &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_errors_fail_closed_per_group() {
        let (resolver, _) = build(MockMemberships::default().with_user(
            "u1",
            vec![
                ("broken", GroupBehaviour::Fails),
                ("granting", grants(&["REPORT_READ"])),
            ],
        ));
        assert!(resolver.check("u1", &["REPORT_READ"]).await.unwrap());

        let (resolver, _) = build(
            MockMemberships::default().with_user("u2", vec![("broken", GroupBehaviour::Fails)]),
        );
        assert!(!resolver.check("u2", &["REPORT_READ"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_lookup_error_moves_on_to_next_permission() {
        let (resolver, _) = build(MockMemberships::default().with_user(
            "u1",
            vec![(
                "flaky",
                GroupBehaviour::PartlyFails {
                    failing: "REPORT_WRITE".to_string(),
                    grants: ["REPORT_READ".to_string()].into(),
                },
            )],
        ));

        assert!(
            resolver
                .check("u1", &["REPORT_WRITE", "REPORT_READ"])
                .await
                .unwrap()
        );
        assert!(!resolver.check("u1", &["REPORT_WRITE", "NOPE"]).await.unwrap());
    }

    async fn wait_until_dropped(tracker: &HangTracker) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while tracker.live.load(Ordering::SeqCst) > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("hung group checks were not aborted");
    }

    #[tokio::test]
    async fn test_in_flight_checks_aborted_after_grant() {
        let (resolver, mock) = build(MockMemberships::default().with_user(
            "u1",
            vec![
                ("stuck-1", GroupBehaviour::Hangs),
                (
                    "granting",
                    GroupBehaviour::GrantsAfterHangs(["REPORT_READ".to_string()].into(), 2),
                ),
                ("stuck-2", GroupBehaviour::Hangs),
            ],
        ));

        assert!(resolver.check("u1", &["REPORT_READ"]).await.unwrap());
        assert_eq!(mock.hangs.started.load(Ordering::SeqCst), 2);
        wait_until_dropped(&mock.hangs).await;
    }

    #[tokio::test]
    async fn test_in_flight_checks_aborted_when_call_dropped() {
        let (resolver, mock) = build(MockMemberships::default().with_user(
            "u1",
            vec![
                ("stuck-1", GroupBehaviour::Hangs),
                ("stuck-2", GroupBehaviour::Hangs),
            ],
        ));

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            resolver.check("u1", &["REPORT_READ"]),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(mock.hangs.started.load(Ordering::SeqCst), 2);
        wait_until_dropped(&mock.hangs).await;
    }

    #[tokio::test]
    async fn test_membership_lookup_error_is_hard() {
        let (resolver, _) = build(MockMemberships {
            fail_membership_lookup: true,
            ..MockMemberships::default()
        });

        let err = resolver.check("u1", &["REPORT_READ"]).await.unwrap_err();
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_first_true_wins_without_waiting_for_stragglers() {
        let (resolver, _) = build(MockMemberships::default().with_user(
            "u1",
            vec![
                ("stuck-1", GroupBehaviour::Hangs),
                ("granting", grants(&["REPORT_READ"])),
                ("stuck-2", GroupBehaviour::Hangs),
            ],
        ));

        let decision = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.check("u1", &["REPORT_READ"]),
        )
        .await
        .expect("resolver waited for a hung group");
        assert!(decision.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_are_checked_concurrently() {
        let (resolver, _) = build(MockMemberships {
            delay: Duration::from_secs(1),
            ..MockMemberships::default().with_user(
                "u1",
                vec![
                    ("g1", grants(&[])),
                    ("g2", grants(&[])),
                    ("g3", grants(&[])),
                    ("g4", grants(&[])),
                ],
            )
        });

        let started = tokio::time::Instant::now();
        assert!(!resolver.check("u1", &["REPORT_READ"]).await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
