mod app_token;

pub use app_token::AppToken;
