//! Typed ID definitions for all domain entities.
//!
//! Each domain store owns its own ids; the ledger refers to them through
//! untyped targets, so these aliases are what keep the cross-store calls honest.
//!
//! # Example
//!
//! ```rust
//! use moderation_core::common::{PostingId, UserId};
//!
//! let user_id: UserId = UserId::new();
//! let posting_id: PostingId = PostingId::new();
//!
//! // This would be a compile error:
//! // let wrong: PostingId = user_id;
//! # let _ = (user_id, posting_id);
//! ```

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for ledger entries (moderation events).
pub struct ModerationEvent;

/// Marker type for User entities (patients, physicians, nurses, admins).
pub struct User;

/// Marker type for Posting entities (discussions and disseminations).
pub struct Posting;

/// Marker type for private Conversation entities.
pub struct Conversation;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for ledger entries.
pub type EventId = Id<ModerationEvent>;

/// Typed ID for User entities.
pub type UserId = Id<User>;

/// Typed ID for Posting entities.
pub type PostingId = Id<Posting>;

/// Typed ID for private Conversation entities.
pub type ConversationId = Id<Conversation>;
