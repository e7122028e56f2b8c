use super::{RepositoryTracker, Services, Tracker, TrackerOption};
use crate::hub::Repository;
use crate::sources::{ChartIndexSource, GitCatalogSource};
use std::sync::Arc;

/// Builds the tracker suited to a repository's kind.
///
/// Chart repositories are observed through their index; every other kind is
/// a git catalog. Options are applied in order after construction. No I/O
/// happens here.
#[must_use]
pub fn new_tracker(svc: Arc<Services>, repository: Repository, options: Vec<TrackerOption>) -> Box<dyn Tracker> {
    let mut tracker: Box<dyn Tracker> = if repository.kind.is_chart_index() {
        Box::new(RepositoryTracker::new(svc, repository, ChartIndexSource::new()))
    } else {
        Box::new(RepositoryTracker::new(svc, repository, GitCatalogSource))
    };

    for option in options {
        option(tracker.as_mut());
    }

    tracker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::RepositoryKind;
    use crate::tracker::testing::Fixture;
    use crate::tracker::{NewTracker, bypass_digest_check, with_timeout};
    use core::time::Duration;
    use url::Url;

    #[test]
    fn settings_come_from_config_then_options() {
        let repo = Repository::new("charts", RepositoryKind::Helm, Url::parse("https://charts.example.com/").unwrap());
        let fixture = Fixture::new(vec![repo.clone()]);

        let plain = new_tracker(fixture.services(), repo.clone(), Vec::new());
        assert!(!plain.settings().bypass_digest_check);
        assert_eq!(plain.settings().timeout, fixture.config.repository_timeout);

        let tuned = new_tracker(
            fixture.services(),
            repo.clone(),
            vec![bypass_digest_check(), with_timeout(Duration::from_secs(3))],
        );
        assert!(tuned.settings().bypass_digest_check);
        assert_eq!(tuned.settings().timeout, Duration::from_secs(3));
        assert_eq!(tuned.repository().id, repo.id);
    }

    #[test]
    fn later_options_win() {
        let repo = Repository::new("plugins", RepositoryKind::Krew, Url::parse("https://github.com/o/r").unwrap());
        let fixture = Fixture::new(vec![repo.clone()]);

        let tracker = new_tracker(
            fixture.services(),
            repo,
            vec![with_timeout(Duration::from_secs(3)), with_timeout(Duration::from_secs(7))],
        );
        assert_eq!(tracker.settings().timeout, Duration::from_secs(7));
    }

    #[test]
    fn factory_matches_the_new_tracker_signature() {
        let factory: NewTracker = new_tracker;
        let repo = Repository::new("falco", RepositoryKind::Falco, Url::parse("https://github.com/o/rules").unwrap());
        let fixture = Fixture::new(vec![repo.clone()]);
        assert_eq!(factory(fixture.services(), repo, Vec::new()).repository().kind, RepositoryKind::Falco);
    }
}
