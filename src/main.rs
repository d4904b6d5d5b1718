use clap::Parser;
use miette::Result;
use rnc::cli::commands::{
    completions, config, export, import, init, pdf, photo, record, report, status,
};
use rnc::cli::{logging, Cli, Commands};
use rnc::entities::RncAction;

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` ends quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    logging::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Init(args) => init::run(args),
        Commands::New(args) => record::run_new(args, &global),
        Commands::List(args) => record::run_list(args, &global),
        Commands::Show(args) => record::run_show(args, &global),
        Commands::Edit(args) => record::run_edit(args, &global),
        Commands::Close(args) => record::run_transition(RncAction::Close, args, &global),
        Commands::Reopen(args) => record::run_transition(RncAction::Reopen, args, &global),
        Commands::Cancel(args) => record::run_transition(RncAction::Cancel, args, &global),
        Commands::Delete(args) => record::run_delete(args, &global),
        Commands::Photo(cmd) => photo::run(cmd, &global),
        Commands::Export(args) => export::run(args, &global),
        Commands::Import(args) => import::run(args, &global),
        Commands::Pdf(args) => pdf::run(args, &global),
        Commands::Report(args) => report::run(args, &global),
        Commands::Status(args) => status::run(args, &global),
        Commands::Config(cmd) => config::run(cmd, &global),
        Commands::Completions(args) => completions::run(args),
    }
}
