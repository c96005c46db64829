//! Fixed user-facing texts.

pub const GREETING: &str =
    "Здравствуйте! Я ваш AI-ассистент для цветочного магазина. Чем могу помочь?";

pub const ASK_OCCASION: &str = "С удовольствием помогу подобрать букет! По какому поводу цветы?";

pub const ASK_BUDGET: &str = "Отлично! На какой бюджет вы рассчитываете?";

pub const ASK_PREFERENCES: &str =
    "Есть ли у вас пожелания по цветам, оттенкам или стилю букета?";

pub const PREPARING_RECOMMENDATION: &str =
    "Спасибо! Подбираю для вас букет, пожалуйста, подождите...";

pub const ORDER_ACCEPTED: &str = "Отлично, ваш заказ принят! Наш менеджер свяжется с вами, \
    чтобы уточнить детали доставки. Спасибо, что выбрали нас!";

pub const ORDER_DECLINED: &str = "Понимаю. Если захотите подобрать другой вариант, \
    просто напишите мне, и я с радостью помогу!";

/// Substituted whenever generation fails or returns nothing.
pub const GENERATION_FAILED: &str = "Извините, у меня возникла проблема. Попробуйте еще раз.";

pub const BUSY: &str = "Пожалуйста, подождите, я обрабатываю ваш предыдущий запрос.";

pub const TEXT_ONLY: &str = "Извините, я понимаю только текстовые сообщения.";

pub const UNEXPECTED_ERROR: &str = "Произошла непредвиденная ошибка. Мы уже работаем над этим.";

pub const FLOW_CANCELLED: &str = "Хорошо, начнём сначала. Чем могу помочь?";

pub const HISTORY_RESET: &str = "История диалога очищена.";
