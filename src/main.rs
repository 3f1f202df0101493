use actix_cors::Cors;
use actix_web::{middleware, App, HttpServer};
use autotune::api::{configure_routes, AppState};
use autotune::banner;
use autotune::config::{AppConfig, ExecutorConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  No .env file loaded: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    match &app_config.executor {
        ExecutorConfig::Local => println!(
            "🧪 Trials run locally with '{}' (timeout {:?}) under {}",
            app_config.sandbox.interpreter,
            app_config.sandbox.timeout,
            app_config.sandbox.root.display()
        ),
        ExecutorConfig::Remote { url, timeout } => {
            println!("🧪 Trials submitted to {} (timeout {:?})", url, timeout)
        }
    }
    println!("📈 Fallback scoring model: {}", app_config.scorer.url);

    let bind = (app_config.host.clone(), app_config.port);
    let state = AppState::new(app_config);

    println!("🚀 Starting server on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(actix_web::web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}
