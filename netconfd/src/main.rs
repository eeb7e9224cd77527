use clap::Parser;
use env_logger::{Builder, Env, Target};
use netconfd::config::{self, Cli};

fn init_logging(level: &str) {
    let env = Env::default().filter_or("NETCONFD_LOG", level);
    let mut builder = Builder::new();
    builder.target(Target::Stderr);
    builder.parse_env(env);
    builder.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(config::log_level(&cli));

    let socket_path = config::resolve_socket_path(&cli);
    if let Err(err) = netconfd::run(&socket_path).await {
        log::error!("netconfd exited with error: {err}");
        std::process::exit(1);
    }
}
