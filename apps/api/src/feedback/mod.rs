// Feedback: teachers rate delivered answers; the history feeds personalization.

pub mod handlers;
pub mod personalization;
