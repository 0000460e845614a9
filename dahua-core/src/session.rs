//! Per-client session state: token, request counter and login flag

/// Owned exclusively by one client; guarded by its lock.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<String>,
    last_id: u64,
    logged_in: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of every login attempt: drop the token and restart ids
    pub fn reset(&mut self) {
        self.token = None;
        self.last_id = 0;
        self.logged_in = false;
    }

    /// Pre-increment and return the id for the next request
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn mark_logged_in(&mut self) {
        self.logged_in = true;
    }

    /// After a successful logout the token is dead
    pub fn clear(&mut self) {
        self.token = None;
        self.logged_in = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_by_one() {
        let mut session = Session::new();
        assert_eq!(session.next_id(), 1);
        assert_eq!(session.next_id(), 2);
        assert_eq!(session.next_id(), 3);
    }

    #[test]
    fn test_reset_restarts_ids_and_drops_token() {
        let mut session = Session::new();
        session.next_id();
        session.next_id();
        session.set_token("S1".to_string());
        session.mark_logged_in();

        session.reset();
        assert_eq!(session.token(), None);
        assert!(!session.is_logged_in());
        assert_eq!(session.next_id(), 1);
    }

    #[test]
    fn test_clear_keeps_counter() {
        let mut session = Session::new();
        session.next_id();
        session.set_token("S1".to_string());
        session.mark_logged_in();

        session.clear();
        assert_eq!(session.token(), None);
        assert!(!session.is_logged_in());
        assert_eq!(session.next_id(), 2);
    }
}
