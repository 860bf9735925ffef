//! Configuration module

mod site;

pub use site::Appearance;
pub use site::CommentConfig;
pub use site::CommentProvider;
pub use site::CusdisConfig;
pub use site::NavLink;
pub use site::SiteConfig;
pub use site::UtterancesConfig;
pub use site::{ENV_ACCESS_TOKEN, ENV_PAGE_ID};
