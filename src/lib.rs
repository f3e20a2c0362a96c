mod cli;
pub mod completion;
pub mod config;
pub mod contacts;
pub mod drafter;
pub mod http;
pub mod logging;
pub mod mailer;
pub mod orchestrator;
pub mod research;
pub mod send_log;
mod units;
mod utils;

use std::rc::Rc;

use log::info;

pub use cli::Cli;
pub use units::{DelayRange, Seconds};

use crate::{
    completion::OpenRouterClient,
    config::Config,
    drafter::EmailDrafter,
    http::HttpClient,
    mailer::{find_resume, smtp_transport, Mailer, ResumeFile},
    orchestrator::Orchestrator,
    research::{CompanyResearcher, DuckDuckGo, ResearchStrategy, WebSearch, Wikipedia},
    send_log::SendLog,
};

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(&cli.get_config_path())?;

    let http = Rc::new(HttpClient::new()?);
    let timeout = config.research_timeout.into();
    let strategies: Vec<Box<dyn ResearchStrategy>> = vec![
        Box::new(Wikipedia::new(Rc::clone(&http), timeout)),
        Box::new(DuckDuckGo::new(Rc::clone(&http), timeout)),
        Box::new(WebSearch::new(Rc::clone(&http), timeout)),
    ];
    let drafter = EmailDrafter::new(
        Box::new(OpenRouterClient::new(Rc::clone(&http), &config)),
        CompanyResearcher::new(strategies),
    );

    let resume = find_resume(&config.templates_dir)
        .map(|path| ResumeFile::new(path, &config.candidate.name));
    let mailer = Mailer::new(&config, resume, Box::new(smtp_transport(&config)?))?;
    let send_log = SendLog::open(&config.send_log_path);

    let mut orchestrator = Orchestrator::new(&config, drafter, mailer, send_log);
    if cli.test {
        orchestrator.run_test()?;
    } else {
        let stdin = std::io::stdin();
        orchestrator.run_production(cli.resume, cli.auto, &mut stdin.lock())?;
    }
    info!("Completed");
    Ok(())
}
