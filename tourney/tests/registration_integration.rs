//! Integration tests for participant registration

mod common;

use chrono::{Duration, Utc};
use common::{FIRST_PLAYER, Harness, ORGANIZER, SPECTATOR};
use std::sync::Arc;
use tourney::db::{Page, RequestContext};
use tourney::tournament::{ErrorKind, NewTournament, TournamentError, TournamentStatus};

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let h = Harness::new();
    let (t, players) = h.open_with_players(1).await;

    let err = h
        .registry
        .register(&h.ctx, t.id, players[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.registry.count_participants(&h.ctx, t.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_registration_requires_open() {
    let h = Harness::new();
    let draft = h
        .tournaments
        .create_tournament(&h.ctx, NewTournament::single_elimination("Later", ORGANIZER))
        .await
        .unwrap();
    let players = h.add_players(1);

    let err = h
        .registry
        .register(&h.ctx, draft.id, players[0])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidState {
            actual: TournamentStatus::Draft,
            ..
        }
    ));
}

#[tokio::test]
async fn test_spectators_cannot_compete() {
    let h = Harness::new();
    let (t, _) = h.open_with_players(0).await;

    let err = h
        .registry
        .register(&h.ctx, t.id, SPECTATOR)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_deadline_passed() {
    let h = Harness::new();
    let t = h
        .open(
            NewTournament::single_elimination("Closed", ORGANIZER)
                .with_deadline(Utc::now() - Duration::minutes(5)),
        )
        .await;
    let players = h.add_players(1);

    let err = h
        .registry
        .register(&h.ctx, t.id, players[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
}

#[tokio::test]
async fn test_future_deadline_allows_registration() {
    let h = Harness::new();
    let t = h
        .open(
            NewTournament::single_elimination("Upcoming", ORGANIZER)
                .with_deadline(Utc::now() + Duration::days(1)),
        )
        .await;
    let players = h.add_players(1);

    h.registry
        .register(&h.ctx, t.id, players[0])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_registrations_respect_capacity() {
    let h = Arc::new(Harness::new());
    let t = h
        .open(NewTournament::single_elimination("Tight", ORGANIZER).with_capacity(None, Some(4)))
        .await;
    let players = h.add_players(16);
    h.store
        .set_latency(Some(std::time::Duration::from_millis(2)));

    let mut handles = Vec::new();
    for player in players {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.registry
                .register(&RequestContext::default(), t.id, player)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::CapacityExceeded),
        }
    }

    assert_eq!(accepted, 4);
    h.store.set_latency(None);
    assert_eq!(h.registry.count_participants(&h.ctx, t.id).await.unwrap(), 4);
}

#[tokio::test]
async fn test_list_participants_in_registration_order() {
    let h = Harness::new();
    let (t, _) = h.open_with_players(30).await;

    let first = h
        .registry
        .list_participants(&h.ctx, t.id, Page::default())
        .await
        .unwrap();
    assert_eq!(first.len(), 20);
    assert_eq!(first[0].player_id, FIRST_PLAYER);

    let rest = h
        .registry
        .list_participants(&h.ctx, t.id, Page::new(20, 100))
        .await
        .unwrap();
    assert_eq!(rest.len(), 10);
    assert_eq!(rest[9].player_id, FIRST_PLAYER + 29);
}

#[tokio::test]
async fn test_unregister_closed_after_start() {
    let h = Harness::new();
    let (t, players) = h.open_with_players(2).await;
    h.tournaments
        .start_tournament(&h.ctx, t.id, ORGANIZER)
        .await
        .unwrap();

    let err = h
        .registry
        .unregister(&h.ctx, t.id, players[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(h.registry.count_participants(&h.ctx, t.id).await.unwrap(), 2);
}
