//! External service integrations
//!
//! ```text
//!   ┌──────────────────────┐      ┌────────────────┐
//!   │ ImageEditService     │      │ Storefront     │
//!   └──────────┬───────────┘      └───────┬────────┘
//!              │                          │
//!     ┌────────┴──────────┐      ┌────────┴───────┐
//!     │ OpenAiImageEditor │      │ ShopifyClient  │
//!     └───────────────────┘      └────────────────┘
//! ```

pub mod traits;
pub mod openai;
pub mod shopify;

// Re-export commonly used types
pub use traits::{
    EditImage,
    ImageEditRequest,
    ImageEditService,
    ProviderError,
    ProviderResult,
    Storefront,
};
pub use openai::OpenAiImageEditor;
pub use shopify::ShopifyClient;
