/// Where a session stands, for progress bars and "n of m" labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPosition {
    /// Zero-based index into the session sequence.
    pub index: usize,
    pub total: usize,
}

impl SessionPosition {
    /// One-based position, 0 for an empty session.
    #[must_use]
    pub fn number(&self) -> usize {
        if self.total == 0 { 0 } else { self.index + 1 }
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }

    /// Share of the sequence reached so far, rounded to a whole percent.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.number() as f64 / self.total as f64 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_labels() {
        let pos = SessionPosition { index: 2, total: 8 };
        assert_eq!(pos.number(), 3);
        assert_eq!(pos.percent(), 38);
        assert!(!pos.is_first());
        assert!(!pos.is_last());

        let empty = SessionPosition { index: 0, total: 0 };
        assert_eq!(empty.number(), 0);
        assert_eq!(empty.percent(), 0);
        assert!(empty.is_last());
    }
}
