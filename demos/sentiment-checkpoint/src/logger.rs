use std::error::Error;

use log::LevelFilter;
use log4rs::{
    Config,
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

pub fn init_log(level: LevelFilter) -> Result<(), Box<dyn Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{h({l})} - {f}:{L}] {m}{n}")))
        .build();
    let appender = Appender::builder().build("stdout", Box::new(stdout));

    log4rs::init_config(
        Config::builder()
            .appender(appender)
            .build(Root::builder().appender("stdout").build(level))?,
    )?;
    update_panic_hook();

    Ok(())
}

fn update_panic_hook() {
    let hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {info}");
        hook(info);
    }));
}
