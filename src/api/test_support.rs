use crate::auth::jwt::{TokenSubject, generate_access_token};
use crate::config::Config;
use crate::model::role::Role;
use sqlx::MySqlPool;
use std::net::SocketAddr;

/// Pool that never connects until a query runs; handler tests only cover
/// paths that are decided before the database is reached.
pub fn lazy_pool() -> MySqlPool {
    MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap()
}

/// The rate limiter keys on the peer IP, so every test request needs one.
pub fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40_000))
}

pub fn bearer(role: Role, employee_id: Option<u64>) -> (&'static str, String) {
    let subject = TokenSubject {
        user_id: 100,
        email: "tester@company.com".to_string(),
        role: role.id(),
        employee_id,
    };
    let token = generate_access_token(&subject, &Config::for_tests().jwt_secret, 900).unwrap();
    ("Authorization", format!("Bearer {token}"))
}

/// Test app with the full route table, wired the way `main` wires it.
#[macro_export]
macro_rules! test_app {
    () => {{
        let config = $crate::config::Config::for_tests();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($crate::api::test_support::lazy_pool()))
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(|cfg| $crate::routes::configure(cfg, config.clone())),
        )
        .await
    }};
}
