use clap_complete::Shell;

pub fn run(shell: Shell, cmd: &mut clap::Command) {
    clap_complete::generate(shell, cmd, "focusnoise", &mut std::io::stdout());
}
