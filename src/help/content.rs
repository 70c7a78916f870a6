use super::{HelpBook, HelpFlag, HelpTopic, Section};

pub(crate) fn book() -> HelpBook<'static> {
    HelpBook {
        title: "Prompt Tags CLI",
        usage: "pt <command> [-n|--negative] [args]",
        topics: ALL_TOPICS,
        footer: &[
            "Use `pt help <topic>` for focused docs, e.g. `pt help dict` or `pt help gestures`.",
            "Commands act on the positive prompt unless -n/--negative is given.",
        ],
    }
}

const NEGATIVE_FLAG: HelpFlag<'static> = HelpFlag {
    name: "-n, --negative",
    desc: "Act on the negative prompt instead of the positive one.",
};

const ALL_TOPICS: &[HelpTopic<'static>] = &[
    HelpTopic {
        name: "add",
        summary: "Add comma-separated tags to the selection.",
        usage: "pt add [-n] <text...>",
        details: &[
            "Arguments are joined and split on commas; each piece is trimmed and blanks are dropped.",
            "Tags already selected are skipped. Every added tag also joins the vocabulary.",
        ],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &["pt add \"masterpiece, best quality\"", "pt add -n blurry lowres"],
    },
    HelpTopic {
        name: "remove",
        summary: "Drop one tag from the selection; the vocabulary keeps it.",
        usage: "pt remove [-n] <tag>",
        details: &[],
        flags: &[NEGATIVE_FLAG],
        aliases: &["rm"],
        section: Section::Command,
        examples: &["pt remove smile"],
    },
    HelpTopic {
        name: "clear",
        summary: "Empty the selection and its marks.",
        usage: "pt clear [-n]",
        details: &[],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "reorder",
        summary: "Replace the selection order with an explicit permutation.",
        usage: "pt reorder [-n] <tag...>",
        details: &[
            "The list must contain exactly the selected tags; anything else is rejected and nothing changes.",
        ],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &["pt reorder c a b"],
    },
    HelpTopic {
        name: "move",
        summary: "Drag a tag to a new position in the selection.",
        usage: "pt move [-n] <tag> <index>",
        details: &[
            "Indices start at 0. Dropping a tag where it already is leaves the order alone.",
        ],
        flags: &[NEGATIVE_FLAG],
        aliases: &["mv"],
        section: Section::Command,
        examples: &["pt move portrait 0"],
    },
    HelpTopic {
        name: "mark",
        summary: "Click a tag to toggle its mark for bundle capture.",
        usage: "pt mark [-n] <tag>",
        details: &[
            "Marked tags show with a leading * and can be saved as a bundle with `pt dict capture <key>`.",
        ],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &["pt mark masterpiece"],
    },
    HelpTopic {
        name: "show",
        summary: "Print both selections with marks and active dictionaries.",
        usage: "pt show",
        details: &[],
        flags: &[],
        aliases: &["status"],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "suggest",
        summary: "List vocabulary tags that match a query and are not selected.",
        usage: "pt suggest [-n] [query]",
        details: &[
            "Matching is a case-insensitive substring test. An empty query lists every unselected tag.",
        ],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &["pt suggest qual"],
    },
    HelpTopic {
        name: "forget",
        summary: "Delete a tag from the vocabulary and the selection.",
        usage: "pt forget [-n] <tag>",
        details: &[],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &["pt forget typo"],
    },
    HelpTopic {
        name: "vocab",
        summary: "List every known tag in collated order.",
        usage: "pt vocab [-n]",
        details: &[],
        flags: &[NEGATIVE_FLAG],
        aliases: &[],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "copy",
        summary: "Copy the positive prompt, record both prompts in history, start fresh.",
        usage: "pt copy [--title <title>]",
        details: &[
            "The positive tags are joined with \", \" and piped to PROMPT_TAGS_CLIPBOARD, or printed when it is unset.",
            "Nothing happens when both selections are empty.",
        ],
        flags: &[HelpFlag {
            name: "-t, --title <title>",
            desc: "Label the history entry.",
        }],
        aliases: &["save"],
        section: Section::Command,
        examples: &["pt copy --title \"rainy street\""],
    },
    HelpTopic {
        name: "history",
        summary: "List, replay or delete captured prompt sets.",
        usage: "pt history [list [-r]|select <index>|delete <index>]",
        details: &[
            "Entries are newest first and capped at 1000.",
            "select replaces both selections with the entry's tags; deleting the selected entry clears them.",
        ],
        flags: &[HelpFlag {
            name: "-r, --relative",
            desc: "Show age instead of the stored timestamp.",
        }],
        aliases: &[],
        section: Section::Command,
        examples: &["pt history", "pt history select 0"],
    },
    HelpTopic {
        name: "dict",
        summary: "Manage tag dictionaries and their bundles.",
        usage: "pt dict <subcommand> [-n] [args]",
        details: &[
            "list | show [name] | use <name> | new <name> | rename <old> <new> | copy <name> [new] | delete <name>",
            "put <key> <labels> | drop <key> | insert <key> | capture <key>",
            "export [name] [path] | import <path> [--as <name>] | merge <path> [--confirm]",
            "Bundle commands act on the active dictionary. The default dictionary cannot be renamed or deleted.",
        ],
        flags: &[
            NEGATIVE_FLAG,
            HelpFlag {
                name: "--as <name>",
                desc: "Import under a different name.",
            },
            HelpFlag {
                name: "--confirm",
                desc: "Allow merging a dictionary of the other type.",
            },
        ],
        aliases: &["dictionary"],
        section: Section::Command,
        examples: &[
            "pt dict put lighting \"rim light, volumetric light\"",
            "pt dict insert lighting",
            "pt dict -n import ~/neg.json --as shared",
        ],
    },
    HelpTopic {
        name: "export",
        summary: "Write vocabularies and history to a JSON file.",
        usage: "pt export [path]",
        details: &[
            "Without a path the file is promptLogs_YYYYMMDD_HHMM.json in the current directory.",
        ],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "import",
        summary: "Merge vocabularies and append history from an export file.",
        usage: "pt import <path>",
        details: &[
            "A malformed file changes nothing. History is appended without removing duplicates.",
        ],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["pt import promptLogs_20240501_1000.json"],
    },
    HelpTopic {
        name: "path",
        summary: "Show the data directory.",
        usage: "pt path",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "help",
        summary: "Show this overview or a focused topic.",
        usage: "pt help [topic]",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["pt help history"],
    },
    HelpTopic {
        name: "gestures",
        summary: "How move and mark map onto drag gestures.",
        usage: "pt help gestures",
        details: &[
            "A gesture starts on a tag and ends over a tag or nowhere. Ending on a different tag moves the dragged tag to that position.",
            "Ending on the same tag without having moved counts as a click and toggles the mark.",
            "Ending nowhere leaves everything as it was.",
        ],
        flags: &[],
        aliases: &["drag"],
        section: Section::Guide,
        examples: &[],
    },
    HelpTopic {
        name: "dictionaries",
        summary: "Bundles, active dictionaries and transfer files.",
        usage: "pt help dictionaries",
        details: &[
            "Each prompt side has its own dictionaries; a bundle maps a key to an ordered list of tags.",
            "Transfer files look like {\"name\": ..., \"type\": \"positive\", \"dictionary\": {key: [tags]}}.",
            "Merging keeps existing bundles when keys collide and reports which keys were added.",
        ],
        flags: &[],
        aliases: &["bundles"],
        section: Section::Guide,
        examples: &[],
    },
    HelpTopic {
        name: "PROMPT_TAGS_DIR",
        summary: "Override the data directory (default ~/.prompt_tags).",
        usage: "PROMPT_TAGS_DIR=/path pt ...",
        details: &["Directory is created on demand if it does not exist."],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &["PROMPT_TAGS_DIR=/tmp/tags pt show"],
    },
    HelpTopic {
        name: "PROMPT_TAGS_CLIPBOARD",
        summary: "Command that receives copied text on stdin.",
        usage: "PROMPT_TAGS_CLIPBOARD=\"wl-copy\" pt copy",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "PROMPT_TAGS_COLLATION",
        summary: "locale (default) or codepoint ordering for keys and vocabulary.",
        usage: "PROMPT_TAGS_COLLATION=codepoint pt vocab",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "PROMPT_TAGS_LOG",
        summary: "Log filter for stderr diagnostics (default warn).",
        usage: "PROMPT_TAGS_LOG=debug pt add cat",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "NO_COLOR",
        summary: "Disable colored output.",
        usage: "NO_COLOR=1 pt show",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
];
