mod openai;
mod rasa;

pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiProvider};
pub use rasa::{DEFAULT_RASA_URL, RasaClassifier};
