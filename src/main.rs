use anyhow::Result;
use log::{error, info};
use structopt::StructOpt;

use emojoid::auth::TermPrompt;
use emojoid::opt::Opt;
use emojoid::runner::{self, CancelFlag};
use emojoid::settings::Settings;
use emojoid::slack::SlackClient;
use emojoid::{logging, tasks};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opt = Opt::from_args();
    logging::init(opt.level_filter()).unwrap();

    std::process::exit(match run(opt).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            1
        }
    });
}

async fn run(opt: Opt) -> Result<i32> {
    let settings = Settings::load(opt.config_path())?;
    let profile = settings.profile(&opt.profile)?;
    let tasks = tasks::resolve_tasks(&profile, opt.start, opt.finish)?;
    info!("resolved {} task(s) for team `{}`", tasks.len(), profile.team);

    let report = if opt.upload {
        let api = SlackClient::new(&profile.team)?;
        let cancel = CancelFlag::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        }
        runner::run(&api, &TermPrompt, &profile, &tasks, &opt.upload_folder, &cancel).await
    } else {
        runner::dry_run(&tasks)
    };

    info!(
        "{} uploaded, {} already existed, {} rejected, {} failed",
        report.successes(),
        report.already_exists(),
        report.rejected(),
        report.transport_failures(),
    );
    Ok(report.exit_code())
}
