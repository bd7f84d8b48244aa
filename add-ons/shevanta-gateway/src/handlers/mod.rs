//! Route handlers. `voice` holds the `/api/*` endpoints.

pub mod voice;
