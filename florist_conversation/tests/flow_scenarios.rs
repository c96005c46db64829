//! End-to-end behaviour of the conversation service with in-memory collaborators.

mod support;

use florist_conversation::{
    Content, ConversationConfig, ConversationService, DialogueState, Field, Inbound, Outcome,
    TurnRole, replies,
};
use florist_core::{Intent, IntentResult, Speaker, UserId};
use std::sync::Arc;
use support::{
    CountingRegistry, FixedProvider, MemoryTranscript, RecordingOutbox, ScriptedClassifier,
};

const USER: UserId = UserId(100);

fn service(provider: Arc<FixedProvider>, classifier: ScriptedClassifier) -> ConversationService {
    ConversationService::new(ConversationConfig::default(), provider, Arc::new(classifier))
}

fn order_classifier() -> ScriptedClassifier {
    ScriptedClassifier::default().with(
        "Хочу заказать цветы",
        IntentResult::new(Intent::OrderFlowers),
    )
}

#[tokio::test]
async fn full_order_flow_reaches_confirmation() {
    let provider = Arc::new(FixedProvider::replying(
        "Предлагаю букет из 9 розовых пионов с эвкалиптом за 2900 рублей. Подходит?",
    ));
    let service = service(Arc::clone(&provider), order_classifier());
    let outbox = RecordingOutbox::default();

    let mut outcomes = Vec::new();
    for text in [
        "Хочу заказать цветы",
        "день рождения",
        "3000 рублей",
        "розовые пионы",
    ] {
        outcomes.push(service.handle(Inbound::text(USER, text), &outbox).await);
    }

    assert_eq!(
        outcomes,
        vec![
            Outcome::Processed(DialogueState::WaitingForOccasion),
            Outcome::Processed(DialogueState::WaitingForBudget),
            Outcome::Processed(DialogueState::WaitingForPreferences),
            Outcome::Processed(DialogueState::ConfirmingOrder),
        ]
    );
    assert_eq!(
        outbox.texts(),
        vec![
            replies::ASK_OCCASION.to_string(),
            replies::ASK_BUDGET.to_string(),
            replies::ASK_PREFERENCES.to_string(),
            replies::PREPARING_RECOMMENDATION.to_string(),
            "Предлагаю букет из 9 розовых пионов с эвкалиптом за 2900 рублей. Подходит?"
                .to_string(),
        ]
    );

    let session = service.sessions().get(USER);
    assert_eq!(session.state(), DialogueState::ConfirmingOrder);
    assert_eq!(session.field(Field::Occasion), Some("день рождения"));
    assert_eq!(session.field(Field::Budget), Some("3000 рублей"));
    assert_eq!(session.field(Field::Preferences), Some("розовые пионы"));
    assert!(session.field(Field::Recommendation).is_some());

    // Only the recommendation needed the model.
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn affirmative_answer_closes_flow() {
    let service = service(Arc::new(FixedProvider::replying("Букет")), order_classifier());
    let outbox = RecordingOutbox::default();
    for text in ["Хочу заказать цветы", "свадьба", "5000", "белые розы"] {
        service.handle(Inbound::text(USER, text), &outbox).await;
    }
    outbox.clear();

    let outcome = service
        .handle(Inbound::text(USER, "Да, согласен"), &outbox)
        .await;

    assert_eq!(outcome, Outcome::Processed(DialogueState::Idle));
    assert_eq!(outbox.texts(), vec![replies::ORDER_ACCEPTED.to_string()]);
    assert!(service.sessions().get(USER).fields().is_empty());
}

#[tokio::test]
async fn non_affirmative_answer_also_closes_flow() {
    let service = service(Arc::new(FixedProvider::replying("Букет")), order_classifier());
    let outbox = RecordingOutbox::default();
    for text in ["Хочу заказать цветы", "свадьба", "5000", "белые розы"] {
        service.handle(Inbound::text(USER, text), &outbox).await;
    }
    outbox.clear();

    let outcome = service
        .handle(Inbound::text(USER, "нет, дороговато"), &outbox)
        .await;

    assert_eq!(outcome, Outcome::Processed(DialogueState::Idle));
    assert_eq!(outbox.texts(), vec![replies::ORDER_DECLINED.to_string()]);
    assert!(service.sessions().get(USER).fields().is_empty());
}

#[tokio::test]
async fn classifier_runs_only_in_idle() {
    let classifier = Arc::new(order_classifier());
    let service = ConversationService::new(
        ConversationConfig::default(),
        Arc::new(FixedProvider::replying("Букет")),
        Arc::clone(&classifier) as Arc<dyn florist_core::IntentClassifier>,
    );
    let outbox = RecordingOutbox::default();

    for text in ["Хочу заказать цветы", "выпускной", "2000", "тюльпаны", "да"] {
        service.handle(Inbound::text(USER, text), &outbox).await;
    }

    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn generator_failure_still_reaches_confirmation() {
    let service = service(Arc::new(FixedProvider::failing()), order_classifier());
    let outbox = RecordingOutbox::default();
    for text in ["Хочу заказать цветы", "8 марта", "1500"] {
        service.handle(Inbound::text(USER, text), &outbox).await;
    }
    outbox.clear();

    let outcome = service
        .handle(Inbound::text(USER, "что-нибудь яркое"), &outbox)
        .await;

    assert_eq!(outcome, Outcome::Processed(DialogueState::ConfirmingOrder));
    assert_eq!(
        outbox.texts(),
        vec![
            replies::PREPARING_RECOMMENDATION.to_string(),
            replies::GENERATION_FAILED.to_string(),
        ]
    );
}

#[tokio::test]
async fn occasion_entity_skips_question() {
    let classifier = ScriptedClassifier::default().with(
        "Нужен букет на юбилей",
        IntentResult::new(Intent::OrderFlowers).with_entity("occasion", "юбилей"),
    );
    let service = service(Arc::new(FixedProvider::failing()), classifier);
    let outbox = RecordingOutbox::default();

    let outcome = service
        .handle(Inbound::text(USER, "Нужен букет на юбилей"), &outbox)
        .await;

    assert_eq!(outcome, Outcome::Processed(DialogueState::WaitingForBudget));
    assert_eq!(outbox.texts(), vec![replies::ASK_BUDGET.to_string()]);
    assert_eq!(
        service.sessions().get(USER).field(Field::Occasion),
        Some("юбилей")
    );
}

#[tokio::test]
async fn open_question_uses_history_and_records_both_turns() {
    let provider = Arc::new(FixedProvider::replying("Доставляем с 9 до 21."));
    let classifier = ScriptedClassifier::default()
        .with("привет", IntentResult::new(Intent::Greeting))
        .with(
            "когда вы доставляете?",
            IntentResult::new(Intent::CheckDeliveryStatus),
        );
    let service = service(Arc::clone(&provider), classifier);
    let outbox = RecordingOutbox::default();

    service.handle(Inbound::text(USER, "привет"), &outbox).await;
    service
        .handle(Inbound::text(USER, "когда вы доставляете?"), &outbox)
        .await;

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let contents: Vec<&str> = requests[0].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        &contents[1..],
        &[
            "привет",
            replies::GREETING,
            "когда вы доставляете?",
            "когда вы доставляете?",
        ]
    );

    let history = service.history().snapshot(USER);
    let roles: Vec<TurnRole> = history.iter().map(|t| t.role()).collect();
    assert_eq!(
        roles,
        vec![
            TurnRole::Input,
            TurnRole::Output,
            TurnRole::Input,
            TurnRole::Output
        ]
    );
    assert_eq!(history[3].text(), "Доставляем с 9 до 21.");
}

#[tokio::test]
async fn unsupported_content_changes_nothing_in_any_state() {
    let service = service(Arc::new(FixedProvider::replying("x")), order_classifier());
    let outbox = RecordingOutbox::default();

    for state in [
        DialogueState::Idle,
        DialogueState::WaitingForOccasion,
        DialogueState::WaitingForBudget,
        DialogueState::WaitingForPreferences,
        DialogueState::ConfirmingOrder,
    ] {
        service.sessions().update(USER, |s| s.set_state(state));
        service.history().append(USER, TurnRole::Input, "earlier");
        let session_before = service.sessions().get(USER);
        let history_before = service.history().snapshot(USER);
        outbox.clear();

        let outcome = service
            .handle(
                Inbound {
                    user: USER,
                    display_name: None,
                    content: Content::Unsupported("photo".to_string()),
                },
                &outbox,
            )
            .await;

        assert_eq!(outcome, Outcome::Unsupported);
        assert_eq!(outbox.texts(), vec![replies::TEXT_ONLY.to_string()]);
        assert_eq!(service.sessions().get(USER), session_before);
        assert_eq!(service.history().snapshot(USER), history_before);
    }
}

#[tokio::test]
async fn history_is_bounded_per_user() {
    let service = ConversationService::new(
        ConversationConfig::default().with_history_limit(4),
        Arc::new(FixedProvider::replying("ok")),
        Arc::new(ScriptedClassifier::default()),
    );
    let outbox = RecordingOutbox::default();

    for i in 0..5 {
        service
            .handle(Inbound::text(USER, format!("вопрос {i}")), &outbox)
            .await;
    }

    let history = service.history().snapshot(USER);
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].text(), "вопрос 3");
    assert_eq!(history[3].text(), "ok");
}

#[tokio::test]
async fn cancel_and_reset_return_to_idle() {
    let service = service(Arc::new(FixedProvider::replying("ok")), order_classifier());
    let outbox = RecordingOutbox::default();
    service
        .handle(Inbound::text(USER, "Хочу заказать цветы"), &outbox)
        .await;
    service
        .handle(Inbound::text(USER, "годовщина"), &outbox)
        .await;

    assert_eq!(
        service.cancel(USER, &outbox).await,
        Outcome::Processed(DialogueState::Idle)
    );
    assert!(service.sessions().get(USER).fields().is_empty());
    assert!(!service.history().snapshot(USER).is_empty());

    assert_eq!(
        service.reset(USER, &outbox).await,
        Outcome::Processed(DialogueState::Idle)
    );
    assert!(service.history().snapshot(USER).is_empty());
}

#[tokio::test]
async fn registry_touched_only_for_idle_messages() {
    let registry = Arc::new(CountingRegistry::default());
    let service = service(Arc::new(FixedProvider::replying("ok")), order_classifier())
        .with_registry(Arc::clone(&registry) as Arc<dyn florist_core::UserRegistry>);
    let outbox = RecordingOutbox::default();

    service
        .handle(
            Inbound::text(USER, "Хочу заказать цветы").with_display_name(Some("Анна".into())),
            &outbox,
        )
        .await;
    service.handle(Inbound::text(USER, "свадьба"), &outbox).await;

    for _ in 0..20 {
        if registry.count() >= 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;

    assert_eq!(registry.count(), 1);
    let touches = registry.touches.lock().map(|t| t.clone()).unwrap_or_default();
    assert_eq!(touches[0].id, USER);
    assert_eq!(touches[0].display_name.as_deref(), Some("Анна"));
}

#[tokio::test]
async fn transcript_records_inputs_and_deliveries() {
    let transcript = Arc::new(MemoryTranscript::default());
    let service = service(Arc::new(FixedProvider::replying("ok")), order_classifier())
        .with_transcript(Arc::clone(&transcript) as Arc<dyn florist_core::Transcript>);
    let outbox = RecordingOutbox::default();

    service
        .handle(Inbound::text(USER, "Хочу заказать цветы"), &outbox)
        .await;

    let lines = transcript.lines.lock().map(|l| l.clone()).unwrap_or_default();
    assert_eq!(
        lines,
        vec![
            (USER, Speaker::User, "Хочу заказать цветы".to_string()),
            (USER, Speaker::Assistant, replies::ASK_OCCASION.to_string()),
        ]
    );
}

#[tokio::test]
async fn welcome_keeps_flow_and_history() {
    let transcript = Arc::new(MemoryTranscript::default());
    let service = service(Arc::new(FixedProvider::replying("ok")), order_classifier())
        .with_transcript(Arc::clone(&transcript) as Arc<dyn florist_core::Transcript>);
    let outbox = RecordingOutbox::default();
    service
        .handle(Inbound::text(USER, "Хочу заказать цветы"), &outbox)
        .await;
    outbox.clear();

    let outcome = service.welcome(USER, "/start", &outbox).await;

    assert_eq!(
        outcome,
        Outcome::Processed(DialogueState::WaitingForOccasion)
    );
    assert_eq!(outbox.texts(), vec![replies::GREETING.to_string()]);
    assert_eq!(service.history().snapshot(USER).len(), 2);
    let lines = transcript.lines.lock().map(|l| l.clone()).unwrap_or_default();
    assert_eq!(
        lines[2..].to_vec(),
        vec![
            (USER, Speaker::User, "/start".to_string()),
            (USER, Speaker::Assistant, replies::GREETING.to_string()),
        ]
    );
}
