//! Cache key layout: `<domain>:<subkey>`.

pub const SHOP_ITEMS: &str = "shop_items";
pub const USER_INVENTORY: &str = "user_inventory";
pub const USER_PROFILE: &str = "user_profile";
pub const HOMEPAGE: &str = "homepage";
pub const SESSION: &str = "session";
pub const RATE_LIMIT: &str = "rate_limit";

pub const FLASH_SALE_CURRENT: &str = "flash_sale:current";
pub const HOMEPAGE_TESTIMONIALS: &str = "homepage:testimonials";
pub const HOMEPAGE_FAQ: &str = "homepage:faq";
pub const HOMEPAGE_COURSE_LEVELS: &str = "homepage:course_levels";

pub fn shop_items(category: &str) -> String {
    format!("{}:{}", SHOP_ITEMS, category)
}

pub fn user_inventory(user_id: &str) -> String {
    format!("{}:{}", USER_INVENTORY, user_id)
}

pub fn user_profile(user_id: &str) -> String {
    format!("{}:{}", USER_PROFILE, user_id)
}

pub fn session(session_id: &str) -> String {
    format!("{}:{}", SESSION, session_id)
}

pub fn rate_limit(identifier: &str) -> String {
    format!("{}:{}", RATE_LIMIT, identifier)
}

/// KEYS pattern covering a whole domain.
pub fn domain_pattern(domain: &str) -> String {
    format!("{}:*", domain)
}
