//! Auxiliary content: blog articles, comment moderation and the contact
//! inbox.

pub mod articles;
pub mod comments;
pub mod contact;
