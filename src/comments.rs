/// Comment threads on issues
use crate::{
    db::models::Comment,
    error::{CivicError, CivicResult},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// A top-level comment with its replies, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Comment thread store
#[derive(Clone)]
pub struct CommentThread {
    db: SqlitePool,
}

impl CommentThread {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Add a comment, optionally replying to `parent_id` on the same issue
    pub async fn add(
        &self,
        issue_id: i64,
        user_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> CivicResult<Comment> {
        let issue_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM issue WHERE id = ?1")
            .bind(issue_id)
            .fetch_optional(&self.db)
            .await?;
        if issue_exists.is_none() {
            return Err(CivicError::NotFound(format!("Issue {} not found", issue_id)));
        }

        if let Some(parent_id) = parent_id {
            let parent_issue: Option<i64> =
                sqlx::query_scalar("SELECT issue_id FROM comment WHERE id = ?1")
                    .bind(parent_id)
                    .fetch_optional(&self.db)
                    .await?;
            if parent_issue != Some(issue_id) {
                return Err(CivicError::NotFound(format!("Comment {} not found", parent_id)));
            }
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(CivicError::Validation("Comment cannot be empty".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO comment (issue_id, user_id, content, parent_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(issue_id)
        .bind(user_id)
        .bind(content)
        .bind(parent_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    /// Get a comment by id
    pub async fn get(&self, id: i64) -> CivicResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.issue_id, c.user_id, a.username, c.content, c.parent_id, c.created_at
            FROM comment c
            JOIN account a ON a.id = c.user_id
            WHERE c.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| CivicError::NotFound(format!("Comment {} not found", id)))
    }

    /// Top-level comments of an issue, each with its replies
    ///
    /// Replies nested deeper than one level are attached to their top-level ancestor.
    pub async fn thread(&self, issue_id: i64) -> CivicResult<Vec<CommentNode>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.issue_id, c.user_id, a.username, c.content, c.parent_id, c.created_at
            FROM comment c
            JOIN account a ON a.id = c.user_id
            WHERE c.issue_id = ?1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.db)
        .await?;

        let parents: HashMap<i64, Option<i64>> =
            comments.iter().map(|c| (c.id, c.parent_id)).collect();
        let root_of = |mut id: i64| {
            while let Some(Some(parent)) = parents.get(&id) {
                id = *parent;
            }
            id
        };

        let mut nodes: Vec<CommentNode> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();
        let mut replies: Vec<(i64, Comment)> = Vec::new();

        for comment in comments {
            match comment.parent_id {
                None => {
                    index.insert(comment.id, nodes.len());
                    nodes.push(CommentNode {
                        comment,
                        replies: Vec::new(),
                    });
                }
                Some(_) => replies.push((root_of(comment.id), comment)),
            }
        }

        for (root, reply) in replies {
            if let Some(&position) = index.get(&root) {
                nodes[position].replies.push(reply);
            }
        }

        Ok(nodes)
    }
}
