//! DOM helper scripts evaluated in the page
//!
//! Each script is an expression-bodied arrow function receiving one JSON
//! argument. Results stay JSON-serializable so `evaluate` can hand them
//! straight back.

/// Census of visible element selectors, used to detect whether a click
/// had any effect (unchanged set ⇒ no effect).
pub const VISIBLE_SELECTORS: &str = r"
(() => {
  const selectors = new Set();
  const selectorFor = (el) => {
    let path = el.tagName.toLowerCase();
    if (el.id) return path + '#' + el.id;
    if (el.classList.length) path += '.' + [...el.classList].join('.');
    return path;
  };
  for (const el of document.querySelectorAll('body *')) {
    const rect = el.getBoundingClientRect();
    if (rect.width > 0 && rect.height > 0 &&
        rect.bottom > 0 && rect.top < window.innerHeight) {
      selectors.add(selectorFor(el));
    }
  }
  return [...selectors].sort();
})()
";

/// Locate the common ancestor container of the elements whose visible
/// text matches the given sections. Argument: `{ sections: string[] }`.
/// Returns `{ selector, hasNextSibling }` or `null`.
pub const FIND_LIST_CONTAINER: &str = r"
((args) => {
  const matches = [];
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT);
  for (let el = walker.nextNode(); el; el = walker.nextNode()) {
    const text = (el.innerText || '').trim();
    if (!text) continue;
    for (const section of args.sections) {
      if (text.includes(section.trim()) && el.children.length === 0) {
        matches.push(el);
        break;
      }
    }
  }
  if (matches.length < 2) return null;

  const ancestors = (el) => {
    const chain = [];
    for (let cur = el; cur; cur = cur.parentElement) chain.push(cur);
    return chain;
  };
  let common = ancestors(matches[0]);
  for (const el of matches.slice(1)) {
    const chain = new Set(ancestors(el));
    common = common.filter((a) => chain.has(a));
  }
  const container = common[0];
  if (!container || container === document.body) return null;

  const selectorFor = (el) => {
    if (el.id) return '#' + el.id;
    const parts = [];
    for (let cur = el; cur && cur !== document.body; cur = cur.parentElement) {
      let part = cur.tagName.toLowerCase();
      if (cur.id) { parts.unshift(part + '#' + cur.id); return parts.join(' > '); }
      const siblings = [...(cur.parentElement?.children || [])].filter(
        (s) => s.tagName === cur.tagName);
      if (siblings.length > 1) part += ':nth-of-type(' + (siblings.indexOf(cur) + 1) + ')';
      parts.unshift(part);
    }
    return 'body > ' + parts.join(' > ');
  };

  const items = [...container.children];
  const last = items[items.length - 1];
  const lastRect = last ? last.getBoundingClientRect() : null;
  const hasNextSibling = !!(lastRect && lastRect.height > 0);
  return { selector: selectorFor(container), hasNextSibling };
})
";

/// Scroll the last child of the container selected by `args.selector`
/// into view. Returns whether a scroll happened.
pub const SCROLL_TO_LAST_SIBLING: &str = r"
((args) => {
  const container = document.querySelector(args.selector);
  if (!container || !container.lastElementChild) return false;
  container.lastElementChild.scrollIntoView({ block: 'end' });
  return true;
})
";

/// Current viewport height, for the fallback scroll step.
pub const VIEWPORT_HEIGHT: &str = "(() => window.innerHeight)()";
