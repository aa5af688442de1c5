// Policy administration: read and edit an organization's policy.

pub mod handlers;
