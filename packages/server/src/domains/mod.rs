// Business domains
pub mod auth;
pub mod conversations;
pub mod events;
pub mod groups;
pub mod moderation;
pub mod postings;
pub mod users;
