//! Client-side controllers for the public listing page and the admin
//! console. They talk to the API through a [`Transport`], so they run the
//! same against a live server or a scripted fake.

mod admin;
mod listing;
mod session;
mod transport;

#[cfg(test)]
mod testing;

pub use admin::{AdminConsole, Form, FormError, LoginError};
pub use listing::{ADMIN_HREF, Content, Link, ListingPage, PAGE_TITLE, Section, Slot};
pub use session::{FileStorage, MemoryStorage, Session, StorageError, TOKEN_KEY, TokenStorage};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
