use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::output_dir(&args.out_dir)?;
    let cmd = nexus_release::command();

    write_page(&out_dir, crate::BIN_NAME, cmd.clone())?;

    // One page per subcommand: nexus-release-release.1, nexus-release-info.1, ...
    for sub in cmd.get_subcommands() {
        let title = format!("{}-{}", crate::BIN_NAME, sub.get_name());
        write_page(&out_dir, &title, sub.clone())?;
    }

    Ok(())
}

fn write_page(out_dir: &Path, title: &str, cmd: clap::Command) -> Result<(), String> {
    let man = clap_mangen::Man::new(cmd).title(title);
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer)
        .map_err(|e| format!("render manpage for {title}: {e}"))?;

    let path = out_dir.join(format!("{title}.1"));
    fs::write(&path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
