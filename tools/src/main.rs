use copse::EarleyParser;

const USAGE: &str = "usage: copse <rules> <lexicon> [--start S] [words...]";

struct Args {
    rules: String,
    lexicon: String,
    start: String,
    words: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let rules = args.next().ok_or(USAGE)?;
    let lexicon = args.next().ok_or(USAGE)?;
    let mut start = "S".to_string();
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" => start = args.next().ok_or(USAGE)?,
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => words.push(arg),
        }
    }
    Ok(Args { rules, lexicon, start, words })
}

fn print_trees(parser: &EarleyParser, sentence: &[&str]) {
    match parser.trees(sentence) {
        Err(e) => println!("Parse err: {}", e),
        Ok(trees) if trees.is_empty() => println!("No parse"),
        Ok(trees) => {
            for tree in &trees {
                println!("{}", tree);
                match serde_json::to_string_pretty(&tree.to_nested()) {
                    Ok(nested) => println!("{}", nested),
                    Err(e) => println!("Json err: {}", e),
                }
            }
            println!("{} tree(s)", trees.len());
        }
    }
}

fn main() -> Result<(), String> {
    let args = parse_args()?;
    let grammar = copse::grammar_from_files(&args.rules, &args.lexicon, &args.start)
        .map_err(|e| e.to_string())?;
    println!("{:?}", grammar);
    let parser = EarleyParser::new(grammar);

    if !args.words.is_empty() {
        let sentence: Vec<&str> = args.words.iter().map(String::as_str).collect();
        print_trees(&parser, &sentence);
        return Ok(());
    }

    use rustyline::error::ReadlineError;
    let mut rl = rustyline::DefaultEditor::new().map_err(|e| e.to_string())?;
    loop {
        match rl.readline("~> ") {
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(format!("Readline err: {:?}", e)),
            Ok(line) => {
                let sentence: Vec<&str> = line.split_whitespace().collect();
                if sentence.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                print_trees(&parser, &sentence);
            }
        }
    }
}

