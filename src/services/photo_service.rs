//! Photo challenge submissions and voting.

use uuid::Uuid;

use crate::{
    dao::models::{EventId, PhotoEntity},
    dto::{
        player::{CheckVoteResponse, VoteAction, VoteResponse},
        sse::{PhotoVoteUpdateEvent, names},
        state::{PhotoView, photo_gallery},
    },
    error::ServiceError,
    services::broadcast,
    state::SharedState,
};

/// Attach a stored photo reference to the player.
pub async fn submit(
    state: &SharedState,
    event_id: EventId,
    player_id: Uuid,
    reference: &str,
) -> Result<Uuid, ServiceError> {
    if !state.event_exists(event_id) {
        return Err(ServiceError::StaleClient);
    }
    let reference = reference.trim().to_owned();
    state
        .with_event_mut(event_id, |event, ctx| {
            if !event.players.contains_key(&player_id) {
                return Err(ServiceError::StaleClient);
            }
            let photo = PhotoEntity {
                id: Uuid::new_v4(),
                player_id,
                reference,
                votes: 0,
                submitted_at: ctx.now,
            };
            let id = photo.id;
            event.photos.insert(id, photo);
            broadcast::queue_photos(event, ctx);
            Ok(id)
        })
        .await
}

/// Gallery ordered by votes, newest first on ties.
pub async fn list(state: &SharedState, event_id: EventId) -> Result<Vec<PhotoView>, ServiceError> {
    state.read_event(event_id, photo_gallery).await
}

/// Add the voter's vote, or withdraw it when already given.
pub async fn toggle_vote(
    state: &SharedState,
    event_id: EventId,
    photo_id: Uuid,
    voter_id: Uuid,
) -> Result<VoteResponse, ServiceError> {
    state
        .with_event_mut(event_id, |event, ctx| {
            if !event.players.contains_key(&voter_id) {
                return Err(ServiceError::StaleClient);
            }
            let photo = event
                .photos
                .get_mut(&photo_id)
                .ok_or_else(|| ServiceError::NotFound(format!("photo `{photo_id}` not found")))?;
            let action = if event.votes.remove(&(photo_id, voter_id)) {
                photo.votes = photo.votes.saturating_sub(1);
                VoteAction::Removed
            } else {
                event.votes.insert((photo_id, voter_id));
                photo.votes += 1;
                VoteAction::Added
            };
            let votes = photo.votes;
            ctx.publish(
                names::PHOTO_VOTE_UPDATE,
                &PhotoVoteUpdateEvent { photo_id, votes },
            );
            Ok(VoteResponse { action, votes })
        })
        .await
}

pub async fn check_vote(
    state: &SharedState,
    event_id: EventId,
    photo_id: Uuid,
    voter_id: Uuid,
) -> Result<CheckVoteResponse, ServiceError> {
    state
        .read_event(event_id, |event| CheckVoteResponse {
            voted: event.votes.contains(&(photo_id, voter_id)),
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::player_service,
        state::tests::test_state,
    };

    #[tokio::test]
    async fn voting_twice_withdraws_the_vote() {
        let (state, _) = test_state().await;
        let author = player_service::register(&state, 1, "Ala").await.unwrap().id;
        let voter = player_service::register(&state, 1, "Ola").await.unwrap().id;
        let photo = submit(&state, 1, author, "/uploads/photos/a.jpg").await.unwrap();
        let mut receiver = state.hub().subscribe(1);

        let first = toggle_vote(&state, 1, photo, voter).await.unwrap();
        assert_eq!((first.action, first.votes), (VoteAction::Added, 1));
        assert!(check_vote(&state, 1, photo, voter).await.unwrap().voted);
        let pushed = receiver.recv().await.unwrap();
        assert_eq!(pushed.event.as_deref(), Some(names::PHOTO_VOTE_UPDATE));

        let second = toggle_vote(&state, 1, photo, voter).await.unwrap();
        assert_eq!((second.action, second.votes), (VoteAction::Removed, 0));
        assert!(!check_vote(&state, 1, photo, voter).await.unwrap().voted);
    }

    #[tokio::test]
    async fn gallery_is_ranked_by_votes() {
        let (state, _) = test_state().await;
        let ala = player_service::register(&state, 1, "Ala").await.unwrap().id;
        let first = submit(&state, 1, ala, "a.jpg").await.unwrap();
        let second = submit(&state, 1, ala, "b.jpg").await.unwrap();
        toggle_vote(&state, 1, first, ala).await.unwrap();

        let gallery = list(&state, 1).await.unwrap();
        assert_eq!(gallery[0].id, first);
        assert_eq!(gallery[0].player_name, "Ala");
        assert_eq!(gallery[1].id, second);
    }

    #[tokio::test]
    async fn unknown_photo_is_not_found() {
        let (state, _) = test_state().await;
        let ala = player_service::register(&state, 1, "Ala").await.unwrap().id;
        assert!(matches!(
            toggle_vote(&state, 1, Uuid::new_v4(), ala).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
