//! Follow edges between users.

use uuid::Uuid;

use crate::{model::User, Database};

/// What a call to [`follow`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
	Created,
	AlreadyFollowing,
	SelfFollow,
}

/// Makes `follower` follow `author`.
///
/// Following yourself, or following someone twice, is a no-op.
pub async fn follow(
	database: &Database,
	follower: &User,
	author: &User,
) -> Result<FollowOutcome, sqlx::Error> {
	if follower.id == author.id {
		return Ok(FollowOutcome::SelfFollow);
	}

	let result = sqlx::query(
		r#"
			INSERT INTO follow (user_id, author_id) VALUES (?, ?)
			ON CONFLICT (user_id, author_id) DO NOTHING
		"#,
	)
	.bind(follower.id)
	.bind(author.id)
	.execute(database)
	.await?;

	Ok(if result.rows_affected() == 0 {
		FollowOutcome::AlreadyFollowing
	} else {
		FollowOutcome::Created
	})
}

/// Removes the edge from `follower` to `author`, returning whether one existed.
pub async fn unfollow(
	database: &Database,
	follower: &User,
	author: &User,
) -> Result<bool, sqlx::Error> {
	let result = sqlx::query("DELETE FROM follow WHERE user_id = ? AND author_id = ?")
		.bind(follower.id)
		.bind(author.id)
		.execute(database)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn is_following(
	database: &Database,
	follower_id: Uuid,
	author_id: Uuid,
) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar(
		"SELECT EXISTS (SELECT 1 FROM follow WHERE user_id = ? AND author_id = ?)",
	)
	.bind(follower_id)
	.bind(author_id)
	.fetch_one(database)
	.await
}
