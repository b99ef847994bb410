use thiserror::Error;

/// One remark left by a user during the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("Please enter your name.")]
    MissingName,
    #[error("Please enter a comment.")]
    MissingText,
}

/// Append-only, in-memory comment list. Nothing is written to disk.
#[derive(Debug, Clone, Default)]
pub struct CommentLog {
    entries: Vec<Comment>,
}

impl CommentLog {
    /// Add a comment after trimming both fields. Blank fields are rejected
    /// and leave the log unchanged.
    pub fn submit(&mut self, name: &str, text: &str) -> Result<(), CommentError> {
        let name = name.trim();
        let text = text.trim();
        if name.is_empty() {
            return Err(CommentError::MissingName);
        }
        if text.is_empty() {
            return Err(CommentError::MissingText);
        }
        self.entries.push(Comment {
            name: name.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    /// Most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Comment> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_name_is_rejected() {
        let mut log = CommentLog::default();
        assert_eq!(log.submit("  ", "hello"), Err(CommentError::MissingName));
        assert_eq!(log.submit("Ann", " \t\n"), Err(CommentError::MissingText));
        assert!(log.is_empty());
    }

    #[test]
    fn newest_entry_is_listed_first() {
        let mut log = CommentLog::default();
        log.submit("Bo", "nice nebula").unwrap();
        log.submit("Cy", "  looks saturated  ").unwrap();
        log.submit("Ann", "hi").unwrap();

        let listed: Vec<(&str, &str)> = log
            .newest_first()
            .map(|c| (c.name.as_str(), c.text.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![("Ann", "hi"), ("Cy", "looks saturated"), ("Bo", "nice nebula")]
        );
        assert_eq!(log.len(), 3);
    }
}
