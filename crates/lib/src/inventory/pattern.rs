//! Shell-style name patterns.

/// Match `name` against a pattern where `*` matches any run of characters
/// (including none) and `?` matches exactly one character.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
  let pattern: Vec<char> = pattern.chars().collect();
  let name: Vec<char> = name.chars().collect();

  let (mut p, mut n) = (0, 0);
  // Position of the last `*` seen and the name index it was tried against.
  let mut backtrack: Option<(usize, usize)> = None;

  while n < name.len() {
    match pattern.get(p) {
      Some('*') => {
        backtrack = Some((p, n));
        p += 1;
      }
      Some(&c) if c == '?' || c == name[n] => {
        p += 1;
        n += 1;
      }
      _ => match backtrack {
        Some((star, tried)) => {
          p = star + 1;
          n = tried + 1;
          backtrack = Some((star, tried + 1));
        }
        None => return false,
      },
    }
  }

  pattern[p..].iter().all(|&c| c == '*')
}
