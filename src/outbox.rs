//! One-way notification queue. Rows are picked up by an external delivery
//! automation; nothing in this crate reads them back.

use tracing::info;

use crate::db::Database;
use crate::error::Result;
use crate::models::NewNotification;

pub trait NotificationSink {
    /// Returns once the notification is accepted for delivery.
    fn enqueue(&self, notification: &NewNotification) -> Result<()>;
}

impl NotificationSink for Database {
    fn enqueue(&self, notification: &NewNotification) -> Result<()> {
        let id = self.insert_notification(notification)?;
        info!(
            outbox_id = id,
            recipient = %notification.recipient_email,
            kind = %notification.kind,
            "notification queued"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::AppError;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: RefCell<Vec<NewNotification>>,
        pub fail: Cell<bool>,
    }

    impl NotificationSink for RecordingSink {
        fn enqueue(&self, notification: &NewNotification) -> Result<()> {
            if self.fail.get() {
                return Err(AppError::Validation("outbox unavailable".to_string()));
            }
            self.sent.borrow_mut().push(notification.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;
    use crate::models::NotificationKind;

    #[test]
    fn test_enqueue_writes_outbox_row() {
        let f = fixture();
        let rx = f.db.watch_changes();
        f.db.enqueue(&NewNotification {
            recipient_id: f.recruiter_id,
            recipient_email: "rita@agency.test".to_string(),
            message: "Casey moved to Offer".to_string(),
            kind: NotificationKind::StageChange,
        })
        .unwrap();
        let tables: Vec<_> = rx.try_iter().map(|e| e.table.name()).collect();
        assert_eq!(tables, vec!["notification_outbox"]);
    }
}
