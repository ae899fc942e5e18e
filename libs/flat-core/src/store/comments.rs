//! Comment threads and reactions
//!
//! Comment writes persist on every call but do not go through the event
//! manager.

use super::FlatStore;
use crate::database::integrity::check_references;
use crate::database::{Collection, Entity};
use crate::error::{FlatError, Result};
use crate::models::{
    Comment, CommentAuthor, CommentPatch, CreateCommentRequest, Patch, ReactionUser,
};
use chrono::Utc;
use flat_common::generate_id;
use std::collections::HashSet;
use tracing::{debug, instrument};

impl FlatStore {
    /// Post a comment or a reply
    ///
    /// The author name and email are copied from the user at posting time.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown user or parent comment,
    /// [`FlatError::ProjectNotFound`] for an unknown project, or
    /// [`FlatError::Validation`] for empty content or a reply across projects
    #[instrument(skip(self, request), fields(project = %request.project_id))]
    pub fn create_comment(&mut self, request: CreateCommentRequest) -> Result<Comment> {
        let user = self
            .db
            .users
            .get(&request.user_id)
            .ok_or_else(|| FlatError::not_found(Collection::Users, &request.user_id))?;
        if !self.db.projects.contains_key(&request.project_id) {
            return Err(FlatError::ProjectNotFound {
                id: request.project_id,
            });
        }
        if let Some(parent_id) = request.parent_id.as_deref() {
            self.check_reply_parent(None, &request.project_id, parent_id)?;
        }

        let comment = Comment {
            id: generate_id(Collection::Comments.id_prefix()),
            project_id: request.project_id,
            user_id: request.user_id,
            author: CommentAuthor {
                name: user.name.clone(),
                email: Some(user.email.clone()),
            },
            content: request.content,
            parent_id: request.parent_id,
            reactions: Default::default(),
            attachments: request.attachments,
            created_at: Utc::now(),
            updated_at: None,
        };
        comment.validate()?;
        check_references(&self.db, &comment)?;

        debug!(comment = %comment.id, "Comment created");
        self.db.comments.insert(comment.id.clone(), comment.clone());
        self.persist();
        Ok(comment)
    }

    /// Comments of a project, oldest first
    #[must_use]
    pub fn get_comments_by_project_id(&self, project_id: &str) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .db
            .comments
            .values()
            .filter(|comment| comment.project_id == project_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        comments
    }

    /// Edit a comment
    ///
    /// A new parent follows the same rules as a reply and may not be the
    /// comment itself or one of its replies.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown comment or parent, or a
    /// validation error for the edited comment
    #[instrument(skip(self, patch))]
    pub fn update_comment(&mut self, id: &str, patch: CommentPatch) -> Result<Comment> {
        let mut comment = self.comment(id)?.clone();
        patch.apply(&mut comment);
        if let Some(parent_id) = comment.parent_id.as_deref() {
            self.check_reply_parent(Some(id), &comment.project_id, parent_id)?;
        }
        comment.touch(Utc::now());
        comment.validate()?;
        check_references(&self.db, &comment)?;

        self.db.comments.insert(id.to_string(), comment.clone());
        self.persist();
        Ok(comment)
    }

    /// Delete a comment and every reply below it; returns how many went
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown comment
    #[instrument(skip(self))]
    pub fn delete_comment(&mut self, id: &str) -> Result<usize> {
        self.comment(id)?;

        let mut doomed = vec![id.to_string()];
        let mut seen: HashSet<String> = doomed.iter().cloned().collect();
        let mut cursor = 0;
        while let Some(current) = doomed.get(cursor).cloned() {
            let replies: Vec<String> = self
                .db
                .comments
                .values()
                .filter(|comment| comment.parent_id.as_deref() == Some(current.as_str()))
                .map(|comment| comment.id.clone())
                .filter(|reply| seen.insert(reply.clone()))
                .collect();
            doomed.extend(replies);
            cursor += 1;
        }
        for comment_id in &doomed {
            self.db.comments.remove(comment_id);
        }

        debug!(comment = id, removed = doomed.len(), "Comment thread deleted");
        self.persist();
        Ok(doomed.len())
    }

    /// Add `user_id`'s reaction; reacting twice with one emoji is a no-op
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown comment or user
    pub fn add_reaction(&mut self, comment_id: &str, emoji: &str, user_id: &str) -> Result<Comment> {
        let user = self
            .db
            .users
            .get(user_id)
            .ok_or_else(|| FlatError::not_found(Collection::Users, user_id))?;
        let reaction = ReactionUser {
            user_id: user.id.clone(),
            name: user.name.clone(),
        };

        let comment = self
            .db
            .comments
            .get_mut(comment_id)
            .ok_or_else(|| FlatError::not_found(Collection::Comments, comment_id))?;
        let users = comment.reactions.entry(emoji.to_string()).or_default();
        if !users.iter().any(|existing| existing.user_id == user_id) {
            users.push(reaction);
        }
        let comment = comment.clone();
        self.persist();
        Ok(comment)
    }

    /// Withdraw `user_id`'s reaction; the emoji disappears with its last user
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown comment
    pub fn remove_reaction(
        &mut self,
        comment_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<Comment> {
        let comment = self
            .db
            .comments
            .get_mut(comment_id)
            .ok_or_else(|| FlatError::not_found(Collection::Comments, comment_id))?;
        if let Some(users) = comment.reactions.get_mut(emoji) {
            users.retain(|existing| existing.user_id != user_id);
            if users.is_empty() {
                comment.reactions.remove(emoji);
            }
        }
        let comment = comment.clone();
        self.persist();
        Ok(comment)
    }

    /// `parent_id` must be a comment on `project_id`, and when `comment_id`
    /// is being edited, not that comment or anything replying to it
    fn check_reply_parent(
        &self,
        comment_id: Option<&str>,
        project_id: &str,
        parent_id: &str,
    ) -> Result<()> {
        let parent = self.comment(parent_id)?;
        if parent.project_id != project_id {
            return Err(FlatError::validation(format!(
                "Comment {parent_id} belongs to project {}, not {project_id}",
                parent.project_id
            )));
        }
        let Some(comment_id) = comment_id else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current.id == comment_id {
                return Err(FlatError::validation(format!(
                    "Comment {comment_id} cannot reply to {parent_id}: it would reply to itself"
                )));
            }
            if !seen.insert(current.id.as_str()) {
                break;
            }
            ancestor = current
                .parent_id
                .as_deref()
                .and_then(|id| self.db.comments.get(id));
        }
        Ok(())
    }

    fn comment(&self, id: &str) -> Result<&Comment> {
        self.db
            .comments
            .get(id)
            .ok_or_else(|| FlatError::not_found(Collection::Comments, id))
    }
}
