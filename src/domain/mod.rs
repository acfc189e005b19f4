pub mod collection;
pub mod item;
pub mod source;

pub use collection::{Collection, FeedFilter, Membership};
pub use item::{format_relative, FeedItem, RawItem};
pub use source::Source;
