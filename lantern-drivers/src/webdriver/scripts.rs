//! Page-side JavaScript executed through WebDriver.
//!
//! The bridge lives on `window.__lantern`. WebDriver cannot veto an event
//! after dispatch, so submit listeners decide synchronously in the page and
//! queue accepted events for the Rust side to drain.

/// Class of the element hosting the shadow-root control surface.
pub const SURFACE_CLASS: &str = "lantern-toolbar";
/// Locates what [`BridgeScripts::mount_surface`] builds with [`SURFACE_CLASS`].
pub const SURFACE_SELECTOR: &str = "div.lantern-toolbar";

pub struct BridgeScripts;

impl BridgeScripts {
    /// Install the bridge once per document. Args: selectors object.
    pub fn install() -> &'static str {
        r#"
        const selectors = arguments[0];
        if (window.__lantern) { window.__lantern.selectors = selectors; return false; }
        const L = window.__lantern = {
            selectors,
            queue: [],
            nextId: 1,
            busy: false,
            commands: [],
            observer: null,
            listening: new WeakSet(),
            menuListening: new WeakSet(),
            menuFor: null,
            menuRender: null,
        };
        L.push = (ev) => { L.queue.push(ev); };
        L.drain = () => L.queue.splice(0, L.queue.length);
        L.isPartial = (text) =>
            L.commands.some((c) => c.name.startsWith(text) && text.length <= c.name.length);
        L.gate = (event) => {
            const textarea = document.querySelector(L.selectors.text_area);
            if (!textarea) return;
            let trigger;
            if (event.type === 'keydown') {
                if (event.key !== 'Enter' || event.shiftKey || event.isComposing) return;
                trigger = { kind: 'key', key: event.key, shift: false, composing: false };
            } else {
                if (L.busy) return;
                trigger = { kind: 'click' };
            }
            const text = textarea.value.trim();
            if (!text || L.isPartial(text)) return;
            event.preventDefault();
            event.stopPropagation();
            if (L.busy) return;
            L.busy = true;
            L.push({ type: 'submit', id: L.nextId++, trigger });
        };
        window.addEventListener('beforeunload', () => {
            if (L.observer) L.observer.disconnect();
        });
        return true;
        "#
    }

    /// Args: selector. Returns whether the element exists.
    pub fn exists() -> &'static str {
        "return document.querySelector(arguments[0]) !== null;"
    }

    pub fn read_value() -> &'static str {
        r#"
        const el = document.querySelector(arguments[0]);
        if (!el) throw new Error('element not found: ' + arguments[0]);
        return el.value ?? el.textContent ?? '';
        "#
    }

    pub fn write_value() -> &'static str {
        r#"
        const el = document.querySelector(arguments[0]);
        if (!el) throw new Error('element not found: ' + arguments[0]);
        el.value = arguments[1];
        "#
    }

    pub fn dispatch_input() -> &'static str {
        r#"
        const el = document.querySelector(arguments[0]);
        if (el) el.dispatchEvent(new Event('input', { bubbles: true }));
        "#
    }

    pub fn focus() -> &'static str {
        "const el = document.querySelector(arguments[0]); if (el) el.focus();"
    }

    pub fn is_disabled() -> &'static str {
        "const el = document.querySelector(arguments[0]); return !!(el && el.disabled);"
    }

    pub fn click() -> &'static str {
        "const el = document.querySelector(arguments[0]); if (el) el.click();"
    }

    pub fn remove() -> &'static str {
        "document.querySelectorAll(arguments[0]).forEach((el) => el.remove());"
    }

    /// Args: submit selector (or null), text area selector.
    pub fn attach_listeners() -> &'static str {
        r#"
        const L = window.__lantern;
        const submit = arguments[0] ? document.querySelector(arguments[0]) : null;
        const textarea = document.querySelector(arguments[1]);
        if (submit && !L.listening.has(submit)) {
            submit.addEventListener('click', L.gate, true);
            L.listening.add(submit);
        }
        if (textarea && !L.listening.has(textarea)) {
            textarea.addEventListener('keydown', L.gate, true);
            L.listening.add(textarea);
        }
        "#
    }

    /// Args: text area selector, surface class, surface state.
    pub fn mount_surface() -> &'static str {
        r#"
        const textarea = document.querySelector(arguments[0]);
        if (!textarea) throw new Error('text area vanished');
        const container = textarea.parentElement && textarea.parentElement.parentElement;
        if (!container) throw new Error('text area has no container');
        const state = arguments[2];
        const host = document.createElement('div');
        host.className = arguments[1];
        const shadow = host.attachShadow({ mode: 'open' });
        const style = document.createElement('style');
        style.textContent = `
            :host { all: initial; }
            .bar { display: flex; gap: 0.75em; align-items: center; padding: 0.25em 0.5em;
                   font: 12px system-ui, sans-serif; color: #6b7280; }
            .on { color: #10a37f; font-weight: 600; }
        `;
        const bar = document.createElement('div');
        bar.className = 'bar';
        const access = document.createElement('span');
        access.className = state.web_access ? 'on' : '';
        access.textContent = state.web_access ? 'Web access: on' : 'Web access: off';
        const results = document.createElement('span');
        results.textContent = state.num_web_results + ' results';
        const period = document.createElement('span');
        period.textContent = state.time_period ? 'Past ' + state.time_period : 'Any time';
        const region = document.createElement('span');
        region.textContent = state.region;
        bar.append(access, results, period, region);
        shadow.append(style, bar);
        container.appendChild(host);
        "#
    }

    /// Args: text area selector, commands array.
    pub fn mount_command_menu() -> &'static str {
        r#"
        const L = window.__lantern;
        L.commands = arguments[1];
        document.querySelectorAll('div.lantern-slash-commands-menu').forEach((el) => el.remove());
        const textarea = document.querySelector(arguments[0]);
        const anchor = textarea && textarea.parentElement && textarea.parentElement.parentElement;
        if (!anchor) return;
        const menu = document.createElement('div');
        menu.className = 'lantern-slash-commands-menu';
        menu.style.display = 'none';
        const render = () => {
            const text = textarea.value;
            const matches = text.startsWith('/')
                ? L.commands.filter((c) => c.name.startsWith(text.split(' ')[0]))
                : [];
            menu.replaceChildren(...matches.map((c) => {
                const item = document.createElement('div');
                item.textContent = c.name + (c.description ? ' - ' + c.description : '');
                item.style.cursor = 'pointer';
                item.addEventListener('mousedown', (e) => {
                    e.preventDefault();
                    textarea.value = c.insert;
                    textarea.dispatchEvent(new Event('input', { bubbles: true }));
                    textarea.focus();
                    render();
                });
                return item;
            }));
            menu.style.display = matches.length ? 'block' : 'none';
        };
        L.menuFor = textarea;
        L.menuRender = render;
        if (!L.menuListening.has(textarea)) {
            textarea.addEventListener('input', (e) => {
                if (L.menuRender && e.target === L.menuFor) L.menuRender();
            });
            L.menuListening.add(textarea);
        }
        anchor.insertBefore(menu, anchor.firstChild);
        "#
    }

    pub fn pad_footer() -> &'static str {
        r#"
        const footer = document.querySelector(arguments[0]);
        const last = footer && footer.lastElementChild;
        if (last) last.style.padding = '0 0 0.5em 0';
        "#
    }

    /// Args: message, lifetime in ms.
    pub fn show_error() -> &'static str {
        r#"
        const banner = document.createElement('div');
        banner.setAttribute('role', 'alert');
        banner.style.cssText = 'position:fixed;top:1em;right:1em;z-index:2147483647;max-width:28em;' +
            'padding:0.75em 2.25em 0.75em 1em;border-radius:6px;background:#fee2e2;color:#991b1b;' +
            'font:13px system-ui,sans-serif;box-shadow:0 2px 8px rgba(0,0,0,.2)';
        banner.textContent = arguments[0];
        const close = document.createElement('button');
        close.textContent = '×';
        close.style.cssText = 'position:absolute;top:0.25em;right:0.5em;border:0;background:none;' +
            'font-size:16px;cursor:pointer;color:inherit';
        close.addEventListener('click', () => banner.remove());
        banner.appendChild(close);
        document.body.appendChild(banner);
        setTimeout(() => banner.remove(), arguments[1]);
        "#
    }

    /// Args: busy flag.
    pub fn set_busy() -> &'static str {
        "if (window.__lantern) window.__lantern.busy = arguments[0];"
    }

    /// Args: root selector. Starts (or restarts) the removal-mutation observer.
    pub fn observe() -> &'static str {
        r#"
        const L = window.__lantern;
        const root = document.querySelector(arguments[0]);
        if (!root) throw new Error('root element not found: ' + arguments[0]);
        if (L.observer) L.observer.disconnect();
        L.observer = new MutationObserver((mutations) => {
            L.push({
                type: 'mutations',
                records: mutations.map((m) => ({
                    removed_nodes: m.removedNodes.length,
                    added_nodes: m.addedNodes.length,
                })),
            });
        });
        L.observer.observe(root, { childList: true, subtree: true });
        "#
    }

    pub fn disconnect() -> &'static str {
        "if (window.__lantern && window.__lantern.observer) { window.__lantern.observer.disconnect(); window.__lantern.observer = null; }"
    }

    /// Returns queued events, or null when the bridge is gone (navigation).
    pub fn drain() -> &'static str {
        "return window.__lantern ? window.__lantern.drain() : null;"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_selector_targets_the_mounted_class() {
        assert_eq!(SURFACE_SELECTOR, format!("div.{SURFACE_CLASS}"));
        assert!(BridgeScripts::mount_surface().contains("host.className = arguments[1]"));
    }

    #[test]
    fn command_menu_listens_once_per_text_area() {
        let script = BridgeScripts::mount_command_menu();
        assert_eq!(script.matches("addEventListener('input'").count(), 1);
        assert!(script.contains("if (!L.menuListening.has(textarea))"));
        assert!(BridgeScripts::install().contains("menuListening: new WeakSet()"));
    }
}
