mod tb_config;
mod tb_controllers;
mod tb_countdown;
mod tb_models;
mod tb_nearby;
mod tb_polling;
mod tb_source;
mod tb_views;

use clap::Parser;
use tb_config::Cli;
use tb_controllers::TBControllers;

#[tokio::main]
async fn main() {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\nThe application encountered an unexpected error:");
        eprintln!("{}", panic_info);
        eprintln!("\n💡 Troubleshooting:");
        eprintln!("  • Please restart the application");
        eprintln!("  • Check your internet connection");
        eprintln!("  • Report this issue if it persists");
        eprintln!("\n{}", "═".repeat(70));
    }));

    // A missing .env file is fine, the environment and flags still apply
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = TBControllers::run(cli).await {
        eprintln!("\n✗ {:#}", e);
        std::process::exit(1);
    }
}
