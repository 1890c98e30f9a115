pub mod chat;

pub use chat::ChatCompletionClient;
