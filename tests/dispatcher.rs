//! Dispatcher behavior tests
//!
//! Uses scripted in-memory adapters so no test touches the network.

use futures::future::BoxFuture;
use futures::FutureExt;
use keyrelay::{
    DispatchError, DispatchRequest, ProviderAdapter, ProviderDispatcher, ProviderId, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// What a scripted adapter does on each call
#[derive(Clone)]
enum Script {
    Reply(&'static str),
    Fail,
    Malformed,
    Hang,
}

/// Records every call and answers according to its script
struct ScriptedAdapter {
    provider: ProviderId,
    script: Script,
    calls: Mutex<Vec<Call>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    key: String,
    prompt: String,
    system: Option<String>,
}

impl ScriptedAdapter {
    fn new(provider: ProviderId, script: Script) -> Arc<Self> {
        Arc::new(Self {
            provider,
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn keys_used(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.key).collect()
    }
}

impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn complete<'a>(
        &'a self,
        key: &'a str,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>> {
        self.calls.lock().push(Call {
            key: key.to_string(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
        });

        let provider = self.provider;
        let script = self.script.clone();
        async move {
            match script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::Fail => Err(DispatchError::ProviderRequestFailed {
                    provider,
                    status: Some(500),
                    message: format!("{} is down", provider),
                }),
                Script::Malformed => Err(DispatchError::malformed(provider, "missing text")),
                Script::Hang => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_only_configured_provider_is_attempted() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("hi there"));
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Reply("unused"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1", "g2"])
        .adapter(gemini.clone())
        .adapter(openai.clone())
        .build();

    assert_eq!(dispatcher.cursor(ProviderId::Gemini), Some(0));

    let text = dispatcher
        .dispatch("hello", &[ProviderId::Gemini, ProviderId::OpenAi], None)
        .await
        .unwrap();

    assert_eq!(text, "hi there");
    assert_eq!(gemini.keys_used(), vec!["g1"]);
    assert!(openai.calls().is_empty());
    assert_eq!(dispatcher.cursor(ProviderId::Gemini), Some(1));
}

#[tokio::test]
async fn test_unkeyed_provider_skipped_without_call() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("unused"));
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Reply("from openai"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::OpenAi, ["o1"])
        .adapter(gemini.clone())
        .adapter(openai.clone())
        .build();

    let completion = dispatcher
        .dispatch_request(
            &DispatchRequest::new("x").with_providers([ProviderId::Gemini, ProviderId::OpenAi]),
        )
        .await
        .unwrap();

    assert_eq!(completion.text, "from openai");
    assert_eq!(completion.provider, ProviderId::OpenAi);
    assert_eq!(completion.attempts, 1);
    assert!(gemini.calls().is_empty());
}

#[tokio::test]
async fn test_falls_back_after_failure() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Fail);
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Reply("ok"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1"])
        .keys(ProviderId::OpenAi, ["o1"])
        .adapter(gemini.clone())
        .adapter(openai.clone())
        .build();

    let text = dispatcher
        .dispatch("x", &[ProviderId::Gemini, ProviderId::OpenAi], None)
        .await
        .unwrap();

    assert_eq!(text, "ok");
    assert_eq!(gemini.keys_used(), vec!["g1"]);
    assert_eq!(openai.keys_used(), vec!["o1"]);
}

#[tokio::test]
async fn test_malformed_response_also_falls_back() {
    let anthropic = ScriptedAdapter::new(ProviderId::Anthropic, Script::Malformed);
    let perplexity = ScriptedAdapter::new(ProviderId::Perplexity, Script::Reply("fine"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Anthropic, ["a1"])
        .keys(ProviderId::Perplexity, ["p1"])
        .adapter(anthropic.clone())
        .adapter(perplexity.clone())
        .build();

    let completion = dispatcher
        .dispatch_request(
            &DispatchRequest::new("x")
                .with_providers([ProviderId::Anthropic, ProviderId::Perplexity]),
        )
        .await
        .unwrap();

    assert_eq!(completion.provider, ProviderId::Perplexity);
    assert_eq!(completion.attempts, 2);
}

#[tokio::test]
async fn test_all_fail_is_exhausted_with_last_error() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Fail);
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Malformed);

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1", "g2"])
        .keys(ProviderId::OpenAi, ["o1", "o2"])
        .adapter(gemini.clone())
        .adapter(openai.clone())
        .build();

    let err = dispatcher
        .dispatch(
            "x",
            &[ProviderId::Gemini, ProviderId::OpenAi, ProviderId::Gemini],
            None,
        )
        .await
        .unwrap_err();

    match &err {
        DispatchError::AllProvidersExhausted {
            attempted,
            last_error,
        } => {
            assert_eq!(attempted, &vec![ProviderId::Gemini, ProviderId::OpenAi]);
            let last = last_error.as_deref().unwrap();
            assert!(matches!(
                last,
                DispatchError::ProviderResponseMalformed {
                    provider: ProviderId::OpenAi,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_terminal());

    // One attempt each, never a second key from the same pool
    assert_eq!(gemini.keys_used(), vec!["g1"]);
    assert_eq!(openai.keys_used(), vec!["o1"]);
}

#[tokio::test]
async fn test_nothing_configured_fails_before_any_call() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("unused"));
    let dispatcher = ProviderDispatcher::builder().adapter(gemini.clone()).build();

    let err = dispatcher
        .dispatch("x", &[ProviderId::Gemini], None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::NoProvidersAvailable { ref requested } if requested == &vec![ProviderId::Gemini]
    ));
    assert!(gemini.calls().is_empty());
    assert!(dispatcher.available_providers().is_empty());
}

#[tokio::test]
async fn test_empty_preference_list_is_no_providers() {
    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1"])
        .build();

    let err = dispatcher.dispatch("x", &[], None).await.unwrap_err();
    assert!(matches!(err, DispatchError::NoProvidersAvailable { .. }));
}

#[tokio::test]
async fn test_missing_adapter_counts_as_failure() {
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Reply("ok"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1"])
        .keys(ProviderId::OpenAi, ["o1"])
        .adapter(openai.clone())
        .build();

    let text = dispatcher
        .dispatch("x", &[ProviderId::Gemini, ProviderId::OpenAi], None)
        .await
        .unwrap();
    assert_eq!(text, "ok");

    // Gemini's key was never drawn since there was nothing to send it with
    assert_eq!(dispatcher.cursor(ProviderId::Gemini), Some(0));
}

#[tokio::test]
async fn test_prompt_and_system_reach_adapter() {
    let anthropic = ScriptedAdapter::new(ProviderId::Anthropic, Script::Reply("done"));
    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Anthropic, ["a1"])
        .adapter(anthropic.clone())
        .build();

    dispatcher
        .dispatch("fix this", &[ProviderId::Anthropic], Some("You are an editor"))
        .await
        .unwrap();

    assert_eq!(
        anthropic.calls(),
        vec![Call {
            key: "a1".to_string(),
            prompt: "fix this".to_string(),
            system: Some("You are an editor".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_successive_dispatches_rotate_keys() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("ok"));
    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1", "g2", "g3"])
        .adapter(gemini.clone())
        .build();

    for _ in 0..4 {
        dispatcher.dispatch_default("x", None).await.unwrap();
    }

    assert_eq!(gemini.keys_used(), vec!["g1", "g2", "g3", "g1"]);
    assert_eq!(dispatcher.cursor(ProviderId::Gemini), Some(1));
}

#[tokio::test]
async fn test_default_order_used_when_request_names_none() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("gemini"));
    let anthropic = ScriptedAdapter::new(ProviderId::Anthropic, Script::Reply("anthropic"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1"])
        .keys(ProviderId::Anthropic, ["a1"])
        .adapter(gemini.clone())
        .adapter(anthropic.clone())
        .default_order(vec![ProviderId::Anthropic, ProviderId::Gemini])
        .build();

    let completion = dispatcher
        .dispatch_request(&DispatchRequest::new("x"))
        .await
        .unwrap();

    assert_eq!(completion.provider, ProviderId::Anthropic);
    assert!(gemini.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_dispatches_share_cursor() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Reply("ok"));
    let dispatcher = Arc::new(
        ProviderDispatcher::builder()
            .keys(ProviderId::Gemini, ["g1", "g2"])
            .adapter(gemini.clone())
            .build(),
    );

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch("x", &[ProviderId::Gemini], None)
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "ok");
    }

    let used = gemini.keys_used();
    assert_eq!(used.len(), 10);
    assert_eq!(used.iter().filter(|k| *k == "g1").count(), 5);
    assert_eq!(used.iter().filter(|k| *k == "g2").count(), 5);
    assert_eq!(dispatcher.cursor(ProviderId::Gemini), Some(0));
}

#[tokio::test]
async fn test_abandoned_dispatch_is_harmless() {
    let gemini = ScriptedAdapter::new(ProviderId::Gemini, Script::Hang);
    let openai = ScriptedAdapter::new(ProviderId::OpenAi, Script::Reply("later"));

    let dispatcher = ProviderDispatcher::builder()
        .keys(ProviderId::Gemini, ["g1"])
        .keys(ProviderId::OpenAi, ["o1"])
        .adapter(gemini.clone())
        .adapter(openai.clone())
        .build();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        dispatcher.dispatch("x", &[ProviderId::Gemini, ProviderId::OpenAi], None),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(openai.calls().is_empty());

    let text = dispatcher
        .dispatch("y", &[ProviderId::OpenAi], None)
        .await
        .unwrap();
    assert_eq!(text, "later");
}
