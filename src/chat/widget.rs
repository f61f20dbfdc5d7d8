use super::backend::{reply_text, ChatBackend};
use super::links::Linkifier;
use super::{ChatError, Transcript};
use crate::cms::{CmsGateway, ContentSource, GatewayError};
use crate::models::profile::ProfileSettings;

type ProfileLoader = Box<dyn FnOnce() -> Result<ProfileSettings, GatewayError> + Send>;

/// One visitor conversation. The owner profile (system prompt and contact
/// links) is loaded on first use and kept for the widget's lifetime.
pub struct ChatWidget<B> {
    backend: B,
    transcript: Transcript,
    fallback_prompt: String,
    loader: Option<ProfileLoader>,
    links: Linkifier,
}

impl<B: ChatBackend> ChatWidget<B> {
    pub fn new(backend: B, fallback_prompt: &str) -> Self {
        ChatWidget {
            backend,
            transcript: Transcript::new(),
            fallback_prompt: fallback_prompt.to_string(),
            loader: None,
            links: Linkifier::from_profile(&ProfileSettings::default()),
        }
    }

    /// Load the profile through `load` when the first message is sent.
    pub fn with_profile_loader<F>(mut self, load: F) -> Self
    where
        F: FnOnce() -> Result<ProfileSettings, GatewayError> + Send + 'static,
    {
        self.loader = Some(Box::new(load));
        self
    }

    /// Load the profile from the CMS when the first message is sent.
    pub fn with_cms<S: ContentSource + 'static>(self, gateway: CmsGateway<S>) -> Self {
        self.with_profile_loader(move || gateway.profile())
    }

    fn ensure_system(&mut self) {
        if self.transcript.has_system() {
            return;
        }
        let profile = match self.loader.take().map(|load| load()) {
            Some(Ok(profile)) => profile,
            Some(Err(e)) => {
                log::warn!("[chat] Profile unavailable, using fallback prompt: {}", e);
                ProfileSettings::default()
            }
            None => ProfileSettings::default(),
        };
        let prompt = profile
            .chatbot_prompt
            .clone()
            .unwrap_or_else(|| self.fallback_prompt.clone());
        self.links = Linkifier::from_profile(&profile);
        self.transcript.set_system(prompt);
    }

    pub fn system_prompt(&mut self) -> String {
        self.ensure_system();
        self.transcript
            .messages()
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    /// Send one visitor message and return the assistant's reply. A failed
    /// send keeps the visitor's turn in the transcript and is not retried.
    pub fn send(&mut self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.ensure_system();

        let request = self.transcript.request_for(text);
        self.transcript.push_user(text);

        let completion = self.backend.complete(&request).map_err(|e| {
            log::warn!("[chat] {}", e);
            e
        })?;
        let reply = reply_text(&completion)?;
        self.transcript.push_assistant(&reply);
        Ok(reply)
    }

    /// Reply for a terminal, named links spelled out.
    pub fn reply_plain(&self, reply: &str) -> String {
        self.links.plain(reply)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatMessage, Role};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Answers "reply N" and records every request it receives.
    #[derive(Default)]
    struct Echo {
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        fail: bool,
    }

    impl ChatBackend for Echo {
        fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
            let mut reqs = self.requests.lock().unwrap();
            reqs.push(messages.to_vec());
            if self.fail {
                return Err(ChatError::Upstream { status: 500, message: "boom".into() });
            }
            Ok(json!({"choices": [{"message": {"content": format!("reply {}", reqs.len())}}]}))
        }
    }

    #[test]
    fn two_sends_alternate_after_system() {
        let backend = Arc::new(Echo::default());
        let mut w = ChatWidget::new(backend.clone(), "fallback");
        assert_eq!(w.send("q1").unwrap(), "reply 1");
        assert_eq!(w.send("q2").unwrap(), "reply 2");

        let msgs = w.transcript().messages();
        let roles: Vec<Role> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(msgs[0].content, "fallback");

        let reqs = backend.requests.lock().unwrap();
        assert_eq!(reqs[1].len(), 4);
        assert_eq!(reqs[1].last(), Some(&ChatMessage::user("q2")));
    }

    #[test]
    fn failure_keeps_user_turn() {
        let backend = Echo { fail: true, ..Default::default() };
        let mut w = ChatWidget::new(backend, "fallback");
        assert!(w.send("hello").is_err());
        assert_eq!(w.transcript().len(), 2);
        assert!(w.send("hello").is_err());
        assert_eq!(w.transcript().len(), 2);
    }

    #[test]
    fn same_question_twice_records_one_user_turn() {
        let backend = Arc::new(Echo::default());
        let mut w = ChatWidget::new(backend.clone(), "fb");
        w.send("q").unwrap();
        w.send("q").unwrap();

        let users = w.transcript().turns().iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, 1);
        assert_eq!(w.transcript().len(), 4);

        let reqs = backend.requests.lock().unwrap();
        assert_eq!(
            reqs[1],
            vec![
                ChatMessage::system("fb"),
                ChatMessage::user("q"),
                ChatMessage::assistant("reply 1"),
                ChatMessage::user("q"),
            ]
        );
    }

    #[test]
    fn profile_loaded_once_with_prompt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut w = ChatWidget::new(Echo::default(), "fallback").with_profile_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ProfileSettings {
                chatbot_prompt: Some("Tu es mon assistant".into()),
                github_url: Some("https://github.com/someone".into()),
                ..Default::default()
            })
        });
        w.send("a").unwrap();
        w.send("b").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(w.system_prompt(), "Tu es mon assistant");
        assert_eq!(w.reply_plain("https://github.com/someone"), "GitHub <https://github.com/someone>");
    }

    #[test]
    fn profile_failure_falls_back() {
        let mut w = ChatWidget::new(Echo::default(), "fallback")
            .with_profile_loader(|| Err(GatewayError::new(500, "down")));
        assert_eq!(w.system_prompt(), "fallback");
    }

    #[test]
    fn blank_message_not_sent() {
        let mut w = ChatWidget::new(Echo::default(), "fallback");
        assert_eq!(w.send("   "), Err(ChatError::EmptyMessage));
        assert!(w.transcript().is_empty());
    }
}
