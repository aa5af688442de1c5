// Dashboard: organization-level KPIs over a recent window of the logs.

pub mod handlers;
pub mod metrics;
