mod chat_api;
mod chat_model;

pub use chat_model::{OpenAIChatProvider, OpenAIChatProviderOptions, GROQ_BASE_URL, OPENAI_BASE_URL};
