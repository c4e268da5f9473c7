pub mod handlers;
pub mod setup;

use clap::{Arg, ArgAction, ArgMatches, Command};
use openstack_inventory_core::TagOptions;

pub fn build_cli() -> Command {
    Command::new("openstack-inventory")
        .version(env!("CARGO_PKG_VERSION"))
        .args_override_self(true)
        .about("Ansible dynamic inventory for OpenStack, with server tagging")
        .after_help(
            "Without SERVER arguments the inventory is printed as JSON.\n\
             With SERVER arguments the flags tag those servers instead.\n\
             Credentials come from OS_USERNAME, OS_PASSWORD, OS_TENANT_NAME and OS_AUTH_URL.",
        )
        .arg(
            Arg::new("server")
                .action(ArgAction::Append)
                .value_name("SERVER")
                .help("OpenStack server id or name to tag"),
        )
        .arg(
            Arg::new("sudo")
                .long("sudo")
                .action(ArgAction::SetTrue)
                .help("Turn on sudo in Ansible"),
        )
        .arg(
            Arg::new("no-sudo")
                .long("no-sudo")
                .action(ArgAction::SetTrue)
                .help("Turn off sudo in Ansible"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("USER")
                .help("User used in Ansible to connect"),
        )
        .arg(
            Arg::new("no-user")
                .long("no-user")
                .action(ArgAction::SetTrue)
                .help("Remove default user for host"),
        )
        .arg(
            Arg::new("role")
                .long("role")
                .value_name("ROLE")
                .action(ArgAction::Append)
                .help("Set role to server (can use multiple times)"),
        )
        .arg(
            Arg::new("no-roles")
                .long("no-roles")
                .action(ArgAction::SetTrue)
                .help("Delete all roles from server"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List inventory (the default without SERVER arguments)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDRESS")
                .conflicts_with("server")
                .help("Print host variables for one inventory address"),
        )
}

/// What a parsed command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Print the whole inventory
    List,
    /// Print the variables of one host
    Host(String),
    /// Tag the named servers
    Tag {
        servers: Vec<String>,
        options: TagOptions,
    },
}

impl Invocation {
    /// Positional servers select tagging; otherwise `--host` or the listing
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let servers: Vec<String> = matches
            .get_many::<String>("server")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        if !servers.is_empty() {
            return Self::Tag {
                servers,
                options: tag_options(matches),
            };
        }

        matches
            .get_one::<String>("host")
            .map_or(Self::List, |host| Self::Host(host.clone()))
    }
}

fn tag_options(matches: &ArgMatches) -> TagOptions {
    TagOptions {
        roles: matches
            .get_many::<String>("role")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        no_roles: matches.get_flag("no-roles"),
        sudo: matches.get_flag("sudo"),
        no_sudo: matches.get_flag("no-sudo"),
        user: matches.get_one::<String>("user").cloned(),
        no_user: matches.get_flag("no-user"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Invocation {
        let argv = std::iter::once("openstack-inventory").chain(args.iter().copied());
        let matches = build_cli().get_matches_from(argv);
        Invocation::from_matches(&matches)
    }

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_no_arguments_lists() {
        assert_eq!(parse(&[]), Invocation::List);
        assert_eq!(parse(&["--list"]), Invocation::List);
    }

    #[test]
    fn test_tag_flags_ignored_without_servers() {
        assert_eq!(parse(&["--sudo", "--role", "web"]), Invocation::List);
    }

    #[test]
    fn test_host_query() {
        assert_eq!(parse(&["--host", "10.0.0.5"]), Invocation::Host("10.0.0.5".into()));
    }

    #[test]
    fn test_host_conflicts_with_servers() {
        let result =
            build_cli().try_get_matches_from(["openstack-inventory", "web-1", "--host", "10.0.0.5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_servers_with_flags() {
        let invocation = parse(&[
            "web-1",
            "web-2",
            "--role",
            "web",
            "--role",
            "db",
            "--sudo",
            "--user",
            "centos",
            "--no-roles",
        ]);
        assert_eq!(
            invocation,
            Invocation::Tag {
                servers: vec!["web-1".into(), "web-2".into()],
                options: TagOptions {
                    roles: vec!["web".into(), "db".into()],
                    no_roles: true,
                    sudo: true,
                    no_sudo: false,
                    user: Some("centos".into()),
                    no_user: false,
                },
            }
        );
    }

    #[test]
    fn test_repeated_user_keeps_last() {
        let invocation = parse(&["web-1", "--user", "centos", "--user", "ubuntu", "--sudo", "--sudo"]);
        assert!(matches!(
            invocation,
            Invocation::Tag { ref options, .. }
                if options.user.as_deref() == Some("ubuntu") && options.sudo
        ));
    }

    #[test]
    fn test_servers_take_precedence_over_list() {
        let invocation = parse(&["web-1", "--list", "--no-sudo", "--no-user"]);
        assert!(matches!(
            invocation,
            Invocation::Tag { ref options, .. } if options.no_sudo && options.no_user
        ));
    }
}
