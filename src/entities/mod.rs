// Entity Models
//
// The expense form constrains the category to a fixed set; the store keeps
// it as free text, so parsing lives here rather than in the gateway.

pub mod category;

pub use category::Category;
